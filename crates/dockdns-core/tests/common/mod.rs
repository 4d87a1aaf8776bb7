//! Test doubles and common utilities for contract tests
//!
//! This module provides a stateful in-memory registrar and a channel-backed
//! event source so tests can drive the reconciler and dispatcher without
//! any network.

use dockdns_core::error::{Error, Result};
use dockdns_core::traits::{
    ContainerEventSource, DomainKey, HostRecord, LifecycleEvent, Registrar,
};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// How a fake registrar call should fail
#[derive(Debug, Clone)]
pub enum FailMode {
    Transport,
    Api { code: String, message: String },
}

impl FailMode {
    fn to_error(&self) -> Error {
        match self {
            FailMode::Transport => Error::transport("fake transport failure"),
            FailMode::Api { code, message } => Error::registrar_api(code.clone(), message.clone()),
        }
    }
}

/// A stateful in-memory registrar that records every submission.
///
/// `replace_records` both records the submitted set and installs it as the
/// new authoritative state, so a subsequent fetch observes the mutation —
/// the same visibility a real registrar provides.
pub struct FakeRegistrar {
    /// Authoritative record sets keyed by domain string
    records: Mutex<HashMap<String, Vec<HostRecord>>>,
    /// Every record set submitted via replace_records, in order
    submissions: Mutex<Vec<Vec<HostRecord>>>,
    /// Number of fetch_records calls
    fetch_count: AtomicUsize,
    /// When set, every call fails with this mode
    fail_all: Mutex<Option<FailMode>>,
    /// Domains whose calls fail with a transport error
    fail_domains: Mutex<Vec<String>>,
}

impl FakeRegistrar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            fetch_count: AtomicUsize::new(0),
            fail_all: Mutex::new(None),
            fail_domains: Mutex::new(Vec::new()),
        })
    }

    /// Install the authoritative record set for a domain
    pub fn seed(&self, domain: &str, records: Vec<HostRecord>) {
        self.records
            .lock()
            .unwrap()
            .insert(domain.to_string(), records);
    }

    /// All record sets submitted so far
    pub fn submissions(&self) -> Vec<Vec<HostRecord>> {
        self.submissions.lock().unwrap().clone()
    }

    /// Current authoritative record set for a domain
    pub fn records_for(&self, domain: &str) -> Vec<HostRecord> {
        self.records
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail
    pub fn fail_all(&self, mode: FailMode) {
        *self.fail_all.lock().unwrap() = Some(mode);
    }

    /// Make calls against one domain fail with a transport error
    pub fn fail_domain(&self, domain: &str) {
        self.fail_domains.lock().unwrap().push(domain.to_string());
    }

    fn check_failure(&self, domain: &DomainKey) -> Result<()> {
        if let Some(mode) = self.fail_all.lock().unwrap().as_ref() {
            return Err(mode.to_error());
        }
        if self
            .fail_domains
            .lock()
            .unwrap()
            .contains(&domain.to_string())
        {
            return Err(Error::transport("fake transport failure"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Registrar for FakeRegistrar {
    async fn fetch_records(&self, domain: &DomainKey) -> Result<Vec<HostRecord>> {
        self.check_failure(domain)?;
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.records_for(&domain.to_string()))
    }

    async fn replace_records(&self, domain: &DomainKey, records: &[HostRecord]) -> Result<()> {
        self.check_failure(domain)?;
        self.submissions.lock().unwrap().push(records.to_vec());
        self.records
            .lock()
            .unwrap()
            .insert(domain.to_string(), records.to_vec());
        Ok(())
    }

    fn registrar_name(&self) -> &'static str {
        "fake"
    }
}

/// A controlled event source that yields events the test sends
pub struct ChannelEventSource {
    /// Receiver for the dispatcher's subscribe stream
    dispatcher_rx: Mutex<Option<mpsc::UnboundedReceiver<LifecycleEvent>>>,
}

impl ChannelEventSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<LifecycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let source = Self {
            dispatcher_rx: Mutex::new(Some(rx)),
        };

        (source, tx)
    }
}

impl ContainerEventSource for ChannelEventSource {
    fn subscribe(&self) -> Pin<Box<dyn Stream<Item = LifecycleEvent> + Send + 'static>> {
        // Take the receiver (only called once)
        let rx = self
            .dispatcher_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once");

        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}
