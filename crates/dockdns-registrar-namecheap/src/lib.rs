//! Namecheap registrar backend for dockdns
//!
//! Implements the [`Registrar`] trait against the Namecheap XML API:
//! `domains.dns.getHosts` for reads, `domains.dns.setHosts` for full-set
//! replaces, plus a paged `domains.getList` for account-wide domain
//! enumeration.
//!
//! Transport notes:
//! - every command is an HTTP POST; authentication travels as ordinary
//!   parameters, not headers
//! - small payloads ride in the query string, bulk record submissions move
//!   to a form-encoded body once they exceed the split threshold
//! - responses are XML in a single fixed namespace, and are sanitized for
//!   control characters the registrar occasionally emits before parsing
//! - retry is a fixed-delay loop on non-2xx status, bounded by the
//!   configured attempt count (default: one attempt, no retry)

pub mod encode;

use async_trait::async_trait;
use dockdns_core::config::RegistrarConfig;
use dockdns_core::error::{Error, Result};
use dockdns_core::traits::{
    DEFAULT_MX_PREF, DEFAULT_TTL, DomainKey, HostRecord, RecordType, Registrar, RegistrarFactory,
};
use dockdns_core::RegistrarRegistry;
use futures_util::Stream;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Production API endpoint
pub const PRODUCTION_ENDPOINT: &str = "https://api.namecheap.com/xml.response";

/// XML namespace of every API response
const XML_NAMESPACE: &str = "http://api.namecheap.com/xml.response";

/// Parameter count above which the payload moves from the query string to a
/// form-encoded request body
const PAYLOAD_SPLIT_THRESHOLD: usize = 10;

/// Default HTTP request timeout
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const CMD_GET_HOSTS: &str = "namecheap.domains.dns.getHosts";
const CMD_SET_HOSTS: &str = "namecheap.domains.dns.setHosts";
const CMD_GET_LIST: &str = "namecheap.domains.getList";

/// One domain row from the account-wide domain listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSummary {
    /// Registrar-assigned domain id
    pub id: String,
    /// Domain name ("example.com")
    pub name: String,
}

/// Namecheap API client
pub struct NamecheapRegistrar {
    api_user: String,
    api_key: String,
    user_name: String,
    client_ip: String,
    endpoint: String,
    attempts_count: u32,
    attempts_delay: Duration,
    client: reqwest::Client,
}

// Custom Debug that doesn't expose the API key
impl fmt::Debug for NamecheapRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamecheapRegistrar")
            .field("api_user", &self.api_user)
            .field("user_name", &self.user_name)
            .field("client_ip", &self.client_ip)
            .field("endpoint", &self.endpoint)
            .field("attempts_count", &self.attempts_count)
            .field("api_key", &"***")
            .finish()
    }
}

impl NamecheapRegistrar {
    /// Create a client against the production endpoint.
    ///
    /// The account username doubles as both the `ApiUser` and `UserName`
    /// credential parameters.
    pub fn new(
        username: impl Into<String>,
        api_key: impl Into<String>,
        client_ip: impl Into<String>,
    ) -> Self {
        let username = username.into();

        Self {
            api_user: username.clone(),
            api_key: api_key.into(),
            user_name: username,
            client_ip: client_ip.into(),
            endpoint: PRODUCTION_ENDPOINT.to_string(),
            attempts_count: 1,
            attempts_delay: Duration::from_millis(100),
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Point the client at a different endpoint (sandbox, test server)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Configure the fixed-delay retry loop; `attempts_count` of 1 disables
    /// retry entirely
    pub fn with_retry(mut self, attempts_count: u32, attempts_delay: Duration) -> Self {
        self.attempts_count = attempts_count.max(1);
        self.attempts_delay = attempts_delay;
        self
    }

    /// Credential and command parameters present on every call
    fn base_params(&self, command: &str) -> Vec<(String, String)> {
        vec![
            ("ApiUser".to_string(), self.api_user.clone()),
            ("ApiKey".to_string(), self.api_key.clone()),
            ("UserName".to_string(), self.user_name.clone()),
            ("ClientIP".to_string(), self.client_ip.clone()),
            ("Command".to_string(), command.to_string()),
        ]
    }

    /// Issue one API command and return the sanitized response body.
    ///
    /// Command parameters ride in the query string unless they exceed the
    /// split threshold, in which case they move to a form-encoded body and
    /// only the credentials stay in the query. Non-2xx responses are
    /// retried with a fixed delay until the attempt budget runs out.
    async fn call(&self, command: &str, extra: Vec<(String, String)>) -> Result<String> {
        let mut query = self.base_params(command);

        let body = if extra.len() > PAYLOAD_SPLIT_THRESHOLD {
            Some(extra)
        } else {
            query.extend(extra);
            None
        };

        let mut attempts_left = self.attempts_count;
        loop {
            let mut request = self.client.post(&self.endpoint).query(&query);
            if let Some(form) = &body {
                request = request.form(form);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::transport(format!("{} request failed: {}", command, e)))?;

            let status = response.status();
            if status.is_success() {
                let raw = response.text().await.map_err(|e| {
                    Error::transport(format!("failed to read {} response: {}", command, e))
                })?;
                return Ok(sanitize_xml(&raw));
            }

            attempts_left -= 1;
            if attempts_left == 0 {
                return Err(Error::transport(format!(
                    "{} returned status {} after {} attempt(s)",
                    command, status, self.attempts_count
                )));
            }

            warn!(command, %status, "retrying after non-success status");
            tokio::time::sleep(self.attempts_delay).await;
        }
    }

    /// Enumerate every domain in the account, fetching pages lazily.
    ///
    /// Pages are requested on demand as the stream is polled; iteration
    /// stops at the first empty page.
    pub fn list_domains(&self) -> impl Stream<Item = Result<DomainSummary>> + '_ {
        struct PageState {
            page: u32,
            buffered: VecDeque<DomainSummary>,
            exhausted: bool,
        }

        futures_util::stream::try_unfold(
            PageState {
                page: 1,
                buffered: VecDeque::new(),
                exhausted: false,
            },
            move |mut state| async move {
                loop {
                    if let Some(domain) = state.buffered.pop_front() {
                        return Ok(Some((domain, state)));
                    }
                    if state.exhausted {
                        return Ok(None);
                    }

                    let batch = self.fetch_domain_page(state.page).await?;
                    if batch.is_empty() {
                        state.exhausted = true;
                    } else {
                        state.page += 1;
                        state.buffered.extend(batch);
                    }
                }
            },
        )
    }

    async fn fetch_domain_page(&self, page: u32) -> Result<Vec<DomainSummary>> {
        debug!(page, "fetching domain list page");

        let extra = vec![("Page".to_string(), page.to_string())];
        let body = self.call(CMD_GET_LIST, extra).await?;

        let doc = parse_document(&body)?;
        check_status(&doc)?;

        let result = find_result(&doc, "DomainGetListResult")?;
        result
            .children()
            .filter(|node| node.is_element() && node.has_tag_name((XML_NAMESPACE, "Domain")))
            .map(|node| {
                Ok(DomainSummary {
                    id: required_attribute(&node, "ID")?,
                    name: required_attribute(&node, "Name")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Registrar for NamecheapRegistrar {
    #[instrument(skip(self), fields(domain = %domain))]
    async fn fetch_records(&self, domain: &DomainKey) -> Result<Vec<HostRecord>> {
        let extra = vec![
            ("SLD".to_string(), domain.sld.clone()),
            ("TLD".to_string(), domain.tld.clone()),
        ];
        let body = self.call(CMD_GET_HOSTS, extra).await?;

        let doc = parse_document(&body)?;
        check_status(&doc)?;

        let result = find_result(&doc, "DomainDNSGetHostsResult")?;
        let records: Vec<HostRecord> = result
            .children()
            .filter(|node| node.is_element())
            .map(|node| host_from_element(&node))
            .collect::<Result<_>>()?;

        debug!(count = records.len(), "fetched host records");
        Ok(records)
    }

    #[instrument(skip(self, records), fields(domain = %domain, count = records.len()))]
    async fn replace_records(&self, domain: &DomainKey, records: &[HostRecord]) -> Result<()> {
        let mut extra = encode::write_params(records);
        extra.push(("SLD".to_string(), domain.sld.clone()));
        extra.push(("TLD".to_string(), domain.tld.clone()));

        let body = self.call(CMD_SET_HOSTS, extra).await?;

        let doc = parse_document(&body)?;
        check_status(&doc)?;

        let result = find_result(&doc, "DomainDNSSetHostsResult")?;
        let succeeded = result
            .attribute("IsSuccess")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if !succeeded {
            return Err(Error::registrar_api(
                "0",
                format!("record submission for {} reported IsSuccess=false", domain),
            ));
        }

        debug!("record set replaced");
        Ok(())
    }

    fn registrar_name(&self) -> &'static str {
        "namecheap"
    }
}

/// Strip characters that are illegal in XML 1.0.
///
/// The API occasionally embeds raw control characters in response text,
/// which would otherwise make the whole document unparseable.
fn sanitize_xml(raw: &str) -> String {
    raw.chars()
        .filter(|&c| {
            let illegal_control = c < '\u{20}' && c != '\t' && c != '\n' && c != '\r';
            !(illegal_control || c == '\u{FFFE}' || c == '\u{FFFF}')
        })
        .collect()
}

fn parse_document(body: &str) -> Result<roxmltree::Document<'_>> {
    roxmltree::Document::parse(body)
        .map_err(|e| Error::decode(format!("malformed XML response: {}", e)))
}

/// Reject responses whose envelope carries `Status="ERROR"`.
///
/// The API signals command failures in-band with a 200 status, so this must
/// run before any result element is consulted.
fn check_status(doc: &roxmltree::Document<'_>) -> Result<()> {
    let root = doc.root_element();
    let status = root.attribute("Status").unwrap_or("");

    if !status.eq_ignore_ascii_case("ERROR") {
        return Ok(());
    }

    let (code, message) = root
        .descendants()
        .find(|node| node.has_tag_name((XML_NAMESPACE, "Error")))
        .map(|node| {
            (
                node.attribute("Number").unwrap_or("unknown").to_string(),
                node.text().unwrap_or("").trim().to_string(),
            )
        })
        .unwrap_or_else(|| ("unknown".to_string(), "no error detail".to_string()));

    Err(Error::registrar_api(code, message))
}

fn find_result<'a>(
    doc: &'a roxmltree::Document<'a>,
    name: &str,
) -> Result<roxmltree::Node<'a, 'a>> {
    doc.descendants()
        .find(|node| node.has_tag_name((XML_NAMESPACE, name)))
        .ok_or_else(|| Error::decode(format!("response is missing the {} element", name)))
}

fn required_attribute(node: &roxmltree::Node<'_, '_>, name: &str) -> Result<String> {
    node.attribute(name)
        .map(str::to_string)
        .ok_or_else(|| Error::decode(format!("{} element has no {} attribute", node.tag_name().name(), name)))
}

fn host_from_element(node: &roxmltree::Node<'_, '_>) -> Result<HostRecord> {
    let name = required_attribute(node, "Name")?;
    let record_type = RecordType::from_wire(&required_attribute(node, "Type")?);
    let address = required_attribute(node, "Address")?;

    let mx_pref = node
        .attribute("MXPref")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MX_PREF);
    let ttl = node
        .attribute("TTL")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TTL);

    Ok(HostRecord {
        name,
        record_type,
        address,
        mx_pref,
        ttl,
    })
}

/// Factory for creating Namecheap registrars from configuration
pub struct NamecheapFactory;

impl RegistrarFactory for NamecheapFactory {
    fn create(&self, config: &RegistrarConfig) -> Result<Box<dyn Registrar>> {
        match config {
            RegistrarConfig::Namecheap {
                username,
                api_key,
                client_ip,
                endpoint,
                attempts_count,
                attempts_delay_ms,
            } => {
                let mut registrar = NamecheapRegistrar::new(username, api_key, client_ip)
                    .with_retry(*attempts_count, Duration::from_millis(*attempts_delay_ms));

                if let Some(endpoint) = endpoint {
                    registrar = registrar.with_endpoint(endpoint);
                }

                Ok(Box::new(registrar))
            }
            other => Err(Error::invalid_input(format!(
                "namecheap factory cannot build a '{}' registrar",
                other.type_name()
            ))),
        }
    }
}

/// Register the Namecheap factory with a registry
pub fn register(registry: &RegistrarRegistry) {
    registry.register_registrar("namecheap", Box::new(NamecheapFactory));
}
