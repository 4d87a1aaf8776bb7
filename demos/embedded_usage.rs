//! Minimal embedding example for dockdns-core
//!
//! This example demonstrates using dockdns-core as a library in a custom
//! application: an in-memory registrar, a hand-fed event source, and a
//! dispatcher whose lifecycle is fully managed by the application.

#![allow(dead_code)]

use dockdns_core::config::EngineConfig;
use dockdns_core::{
    traits::{
        ContainerEventSource, DomainKey, EventAction, HostRecord, LifecycleEvent, Registrar,
    },
    DispatchEvent, Dispatcher, Result,
};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio_stream::Stream;

/// In-memory registrar for embedded usage
struct EmbeddedRegistrar {
    records: Mutex<HashMap<String, Vec<HostRecord>>>,
}

impl EmbeddedRegistrar {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
        })
    }

    fn dump(&self) {
        for (domain, records) in self.records.lock().unwrap().iter() {
            for record in records {
                println!(
                    "  {}.{} {} {}",
                    record.name,
                    domain,
                    record.record_type.as_wire(),
                    record.address
                );
            }
        }
    }
}

#[async_trait::async_trait]
impl Registrar for EmbeddedRegistrar {
    async fn fetch_records(&self, domain: &DomainKey) -> Result<Vec<HostRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&domain.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_records(&self, domain: &DomainKey, records: &[HostRecord]) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(domain.to_string(), records.to_vec());
        Ok(())
    }

    fn registrar_name(&self) -> &'static str {
        "embedded"
    }
}

/// Event source fed from a channel the application controls
struct EmbeddedEventSource {
    rx: Mutex<Option<tokio::sync::mpsc::UnboundedReceiver<LifecycleEvent>>>,
}

impl EmbeddedEventSource {
    fn new() -> (Self, tokio::sync::mpsc::UnboundedSender<LifecycleEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl ContainerEventSource for EmbeddedEventSource {
    fn subscribe(&self) -> Pin<Box<dyn Stream<Item = LifecycleEvent> + Send + 'static>> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once");
        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let registrar = EmbeddedRegistrar::new();
    let (source, event_tx) = EmbeddedEventSource::new();

    let mut registrars: HashMap<String, Arc<dyn Registrar>> = HashMap::new();
    registrars.insert("embedded".to_string(), registrar.clone());

    let (dispatcher, mut dispatch_rx) = Dispatcher::new(
        Box::new(source),
        registrars,
        &EngineConfig::default(),
    );

    // Simulate a container start; dropping the sender afterwards closes the
    // feed, which ends the dispatcher run.
    event_tx
        .send(LifecycleEvent::new(
            EventAction::Start,
            "cafe01",
            vec![
                "VIRTUAL_HOST=app.example.com".to_string(),
                "REGISTRAR=embedded".to_string(),
                "EXTERNAL_IP=203.0.113.7".to_string(),
            ],
        ))
        .expect("feed is open");
    drop(event_tx);

    dispatcher.run().await?;

    while let Ok(event) = dispatch_rx.try_recv() {
        if let DispatchEvent::BindingApplied { fqdn, outcome } = event {
            println!("applied {}: {:?}", fqdn, outcome);
        }
    }

    println!("registrar state:");
    registrar.dump();

    Ok(())
}
