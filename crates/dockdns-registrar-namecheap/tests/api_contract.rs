//! HTTP contract tests for the Namecheap client
//!
//! These tests run the client against a local mock server and verify the
//! wire behavior: parameter placement, envelope error mapping, the
//! fixed-delay retry loop, response sanitization, and domain list paging.

use dockdns_core::traits::{DomainKey, HostRecord, Registrar};
use dockdns_core::Error;
use dockdns_registrar_namecheap::{DomainSummary, NamecheapRegistrar};
use futures_util::TryStreamExt;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NS: &str = "http://api.namecheap.com/xml.response";

fn client_for(server: &MockServer) -> NamecheapRegistrar {
    NamecheapRegistrar::new("acme", "key", "203.0.113.9").with_endpoint(server.uri())
}

fn domain() -> DomainKey {
    DomainKey::parse("example.com").unwrap()
}

fn ok_envelope(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<ApiResponse Status="OK" xmlns="{NS}">
  <Errors/>
  <CommandResponse>{inner}</CommandResponse>
</ApiResponse>"#
    )
}

#[tokio::test]
async fn get_hosts_sends_credentials_and_parses_records() {
    let server = MockServer::start().await;

    let body = ok_envelope(
        r#"<DomainDNSGetHostsResult Domain="example.com">
             <host HostId="1" Name="@" Type="A" Address="1.2.3.4" MXPref="10" TTL="1799"/>
             <host HostId="2" Name="www" Type="CNAME" Address="example.com." MXPref="10" TTL="1799"/>
           </DomainDNSGetHostsResult>"#,
    );

    Mock::given(method("POST"))
        .and(query_param("Command", "namecheap.domains.dns.getHosts"))
        .and(query_param("ApiUser", "acme"))
        .and(query_param("ApiKey", "key"))
        .and(query_param("UserName", "acme"))
        .and(query_param("ClientIP", "203.0.113.9"))
        .and(query_param("SLD", "example"))
        .and(query_param("TLD", "com"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let records = client_for(&server).fetch_records(&domain()).await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records[0].is_a_for("@"));
    assert_eq!(records[0].address, "1.2.3.4");
    assert_eq!(records[1].name, "www");
}

#[tokio::test]
async fn error_envelope_maps_to_registrar_api_error() {
    let server = MockServer::start().await;

    let body = format!(
        r#"<ApiResponse Status="ERROR" xmlns="{NS}">
             <Errors><Error Number="2019166">Domain not found</Error></Errors>
           </ApiResponse>"#
    );

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_records(&domain()).await.unwrap_err();

    match err {
        Error::RegistrarApi { code, message } => {
            assert_eq!(code, "2019166");
            assert_eq!(message, "Domain not found");
        }
        other => panic!("expected RegistrarApi, got {:?}", other),
    }
}

#[tokio::test]
async fn non_success_status_is_retried_until_attempts_run_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = NamecheapRegistrar::new("acme", "key", "203.0.113.9")
        .with_endpoint(server.uri())
        .with_retry(3, Duration::from_millis(1));

    let err = client.fetch_records(&domain()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn single_attempt_config_does_not_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_records(&domain()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn bulk_set_hosts_moves_records_to_the_form_body() {
    let server = MockServer::start().await;

    // Three records produce 15 numbered parameters, past the query/body
    // split threshold: the credentials stay in the query string while the
    // record fields travel form-encoded.
    Mock::given(method("POST"))
        .and(query_param("Command", "namecheap.domains.dns.setHosts"))
        .and(query_param("ApiKey", "key"))
        .and(body_string_contains("HostName1=a"))
        .and(body_string_contains("RecordType1=A"))
        .and(body_string_contains("HostName3=c"))
        .and(body_string_contains("SLD=example"))
        .and(body_string_contains("TLD=com"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_envelope(
            r#"<DomainDNSSetHostsResult Domain="example.com" IsSuccess="true"/>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let records = vec![
        HostRecord::a_record("a", "1.1.1.1"),
        HostRecord::a_record("b", "2.2.2.2"),
        HostRecord::a_record("c", "3.3.3.3"),
    ];

    client_for(&server)
        .replace_records(&domain(), &records)
        .await
        .unwrap();
}

#[tokio::test]
async fn small_set_hosts_rides_in_the_query_string() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("Command", "namecheap.domains.dns.setHosts"))
        .and(query_param("HostName1", "a"))
        .and(query_param("Address1", "1.1.1.1"))
        .and(query_param("SLD", "example"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_envelope(
            r#"<DomainDNSSetHostsResult Domain="example.com" IsSuccess="true"/>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .replace_records(&domain(), &[HostRecord::a_record("a", "1.1.1.1")])
        .await
        .unwrap();
}

#[tokio::test]
async fn set_hosts_failure_flag_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_envelope(
            r#"<DomainDNSSetHostsResult Domain="example.com" IsSuccess="false"/>"#,
        )))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .replace_records(&domain(), &[HostRecord::a_record("a", "1.1.1.1")])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RegistrarApi { .. }));
}

#[tokio::test]
async fn control_characters_in_the_response_are_tolerated() {
    let server = MockServer::start().await;

    // A raw 0x08 inside the payload would normally poison the XML parser.
    let body = ok_envelope(
        "<DomainDNSGetHostsResult Domain=\"example.com\">\
           <host Name=\"@\" Type=\"TXT\" Address=\"v=spf1\u{8} -all\" MXPref=\"10\" TTL=\"1799\"/>\
         </DomainDNSGetHostsResult>",
    );

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let records = client_for(&server).fetch_records(&domain()).await.unwrap();
    assert_eq!(records[0].address, "v=spf1 -all");
}

#[tokio::test]
async fn list_domains_pages_until_an_empty_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("Command", "namecheap.domains.getList"))
        .and(query_param("Page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_envelope(
            r#"<DomainGetListResult>
                 <Domain ID="11" Name="example.com"/>
                 <Domain ID="12" Name="example.org"/>
               </DomainGetListResult>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(query_param("Command", "namecheap.domains.getList"))
        .and(query_param("Page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_envelope(
            r#"<DomainGetListResult/>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let domains: Vec<DomainSummary> = client.list_domains().try_collect().await.unwrap();

    assert_eq!(domains.len(), 2);
    assert_eq!(domains[0].name, "example.com");
    assert_eq!(domains[1].id, "12");
}
