// # Registrar Trait
//
// Defines the interface for reading and replacing a domain's authoritative
// host record set.
//
// ## Implementations
//
// - Namecheap: `dockdns-registrar-namecheap` crate
// - Future: Gandi, Porkbun, etc.
//
// ## Contract
//
// The registrar exposes only two primitives: fetch the *full* record list
// for a domain, and replace the *full* record list for a domain. There is
// no partial update. Every mutation the [`Reconciler`](crate::Reconciler)
// performs must therefore round-trip the entire record set, which makes
// read-then-write races possible between concurrent reconciles against the
// same domain. That race is accepted; the reconciler's delta-of-exactly-1
// guard detects (but cannot prevent) lost updates.
//
// Implementations must be single-shot: one fetch or one replace per call,
// with transport retry policy owned by the implementation's own transport
// configuration, never by looping callers.

use async_trait::async_trait;
use std::fmt;

/// Default MX preference for newly created records
pub const DEFAULT_MX_PREF: u32 = 10;

/// Default TTL for newly created records (the registrar's "automatic" TTL)
pub const DEFAULT_TTL: u32 = 1799;

/// A domain split into (second-level, top-level-and-rest) at the first dot.
///
/// This is the addressing unit for every registrar call. There is exactly
/// one split point (the leftmost dot), so FQDNs with multi-label SLDs are
/// not distinguished from simple ones. Known modeling simplification, not
/// configurable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainKey {
    /// Second-level domain ("example" in "example.com")
    pub sld: String,
    /// Top level and everything after it ("com", or "co.uk")
    pub tld: String,
}

impl DomainKey {
    /// Split a domain string at its first dot.
    ///
    /// Fails if the string has no dot or an empty side.
    pub fn parse(domain: &str) -> Result<Self, crate::Error> {
        let (sld, tld) = domain.split_once('.').ok_or_else(|| {
            crate::Error::invalid_input(format!("domain '{}' has no dot separator", domain))
        })?;

        if sld.is_empty() || tld.is_empty() {
            return Err(crate::Error::invalid_input(format!(
                "domain '{}' has an empty label",
                domain
            )));
        }

        Ok(Self {
            sld: sld.to_string(),
            tld: tld.to_string(),
        })
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sld, self.tld)
    }
}

/// DNS record type as the registrar reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Mxe,
    Txt,
    Url,
    Url301,
    Frame,
    /// Any type this crate does not model explicitly
    Other(String),
}

impl RecordType {
    /// The registrar's wire name for this type
    pub fn as_wire(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Mxe => "MXE",
            RecordType::Txt => "TXT",
            RecordType::Url => "URL",
            RecordType::Url301 => "URL301",
            RecordType::Frame => "FRAME",
            RecordType::Other(s) => s,
        }
    }

    /// Parse a wire name; unknown types are preserved verbatim
    pub fn from_wire(s: &str) -> Self {
        match s {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "MXE" => RecordType::Mxe,
            "TXT" => RecordType::Txt,
            "URL" => RecordType::Url,
            "URL301" => RecordType::Url301,
            "FRAME" => RecordType::Frame,
            other => RecordType::Other(other.to_string()),
        }
    }
}

/// A single host record within a domain's record set.
///
/// This is the read shape. The write shape the submission endpoint expects
/// differs only in field naming (`Name`→`HostName`, `Type`→`RecordType`);
/// that rename is a wire concern owned by the registrar implementation, not
/// a separate entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    /// Subdomain label, or "@" for the apex
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Record target (an IP for A records, a URL for URL records, ...)
    pub address: String,
    /// MX preference (meaningful for MX records, carried for all)
    pub mx_pref: u32,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl HostRecord {
    /// Create an A record with the default MX preference and TTL
    pub fn a_record(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            address: address.into(),
            mx_pref: DEFAULT_MX_PREF,
            ttl: DEFAULT_TTL,
        }
    }

    /// Whether this is an A record for the given subdomain label
    pub fn is_a_for(&self, name: &str) -> bool {
        self.record_type == RecordType::A && self.name == name
    }
}

/// Trait for registrar implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Fetch the full current host record list for a domain.
    ///
    /// The record set is never partially addressable; this always returns
    /// everything the registrar holds for the domain.
    async fn fetch_records(&self, domain: &DomainKey) -> Result<Vec<HostRecord>, crate::Error>;

    /// Replace the domain's full record set with `records`.
    ///
    /// This is the only mutation primitive the registrar offers. Callers
    /// own the read-modify-write cycle.
    async fn replace_records(
        &self,
        domain: &DomainKey,
        records: &[HostRecord],
    ) -> Result<(), crate::Error>;

    /// Get the registrar name (for logging/debugging)
    fn registrar_name(&self) -> &'static str;
}

/// Helper trait for constructing registrars from configuration
pub trait RegistrarFactory: Send + Sync {
    /// Create a Registrar instance from configuration
    fn create(
        &self,
        config: &crate::config::RegistrarConfig,
    ) -> Result<Box<dyn Registrar>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_key_splits_at_first_dot() {
        let key = DomainKey::parse("example.co.uk").unwrap();
        assert_eq!(key.sld, "example");
        assert_eq!(key.tld, "co.uk");
        assert_eq!(key.to_string(), "example.co.uk");
    }

    #[test]
    fn domain_key_rejects_single_label() {
        assert!(DomainKey::parse("localhost").is_err());
        assert!(DomainKey::parse("").is_err());
        assert!(DomainKey::parse(".com").is_err());
        assert!(DomainKey::parse("example.").is_err());
    }

    #[test]
    fn record_type_round_trips_known_and_unknown() {
        assert_eq!(RecordType::from_wire("A"), RecordType::A);
        assert_eq!(RecordType::from_wire("URL").as_wire(), "URL");
        let caa = RecordType::from_wire("CAA");
        assert_eq!(caa, RecordType::Other("CAA".to_string()));
        assert_eq!(caa.as_wire(), "CAA");
    }

    #[test]
    fn a_record_carries_defaults() {
        let record = HostRecord::a_record("app", "1.2.3.4");
        assert_eq!(record.mx_pref, DEFAULT_MX_PREF);
        assert_eq!(record.ttl, DEFAULT_TTL);
        assert!(record.is_a_for("app"));
        assert!(!record.is_a_for("www"));
    }
}
