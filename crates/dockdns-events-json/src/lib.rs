//! Newline-delimited JSON container event feed
//!
//! Reads a normalized lifecycle event feed, one JSON object per line, from
//! a regular file, a FIFO, or standard input (path `"-"`). External glue
//! (for example a shell pipeline off the container runtime's event API)
//! produces the feed; this crate only consumes it.
//!
//! Wire format per line:
//!
//! ```json
//! {"action":"start","id":"cafe01","env":["VIRTUAL_HOST=a.example.com"]}
//! ```
//!
//! Lines that fail to parse are logged and skipped; the feed keeps going.
//! The stream ends when the underlying reader reaches end of input.

use dockdns_core::config::EventSourceConfig;
use dockdns_core::error::{Error, Result};
use dockdns_core::traits::{
    ContainerEventSource, EventAction, EventSourceFactory, LifecycleEvent,
};
use dockdns_core::RegistrarRegistry;
use serde::Deserialize;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, error, warn};

/// One feed line as it appears on the wire
#[derive(Debug, Deserialize)]
struct WireEvent {
    /// Lifecycle action label ("start", "die", ...)
    action: String,
    /// Container id
    id: String,
    /// Environment as "KEY=VALUE" strings
    #[serde(default)]
    env: Vec<String>,
}

impl From<WireEvent> for LifecycleEvent {
    fn from(wire: WireEvent) -> Self {
        LifecycleEvent::new(EventAction::from_label(&wire.action), wire.id, wire.env)
    }
}

/// Parse one feed line into an event
fn parse_line(line: &str) -> Result<LifecycleEvent> {
    let wire: WireEvent = serde_json::from_str(line)
        .map_err(|e| Error::decode(format!("bad event line: {}", e)))?;
    Ok(wire.into())
}

/// Event source backed by a newline-delimited JSON feed
pub struct JsonLinesEventSource {
    /// Feed path; "-" reads standard input
    path: String,
}

impl JsonLinesEventSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    async fn pump<R>(reader: R, tx: mpsc::UnboundedSender<LifecycleEvent>)
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match parse_line(trimmed) {
                        Ok(event) => {
                            debug!(container_id = %event.container_id, "feed event");
                            if tx.send(event).is_err() {
                                // Subscriber dropped the stream
                                return;
                            }
                        }
                        Err(e) => warn!("skipping malformed feed line: {}", e),
                    }
                }
                Ok(None) => {
                    debug!("event feed reached end of input");
                    return;
                }
                Err(e) => {
                    error!("event feed read failed: {}", e);
                    return;
                }
            }
        }
    }
}

impl ContainerEventSource for JsonLinesEventSource {
    fn subscribe(&self) -> Pin<Box<dyn Stream<Item = LifecycleEvent> + Send + 'static>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let path = self.path.clone();

        tokio::spawn(async move {
            if path == "-" {
                Self::pump(BufReader::new(tokio::io::stdin()), tx).await;
            } else {
                match tokio::fs::File::open(&path).await {
                    Ok(file) => Self::pump(BufReader::new(file), tx).await,
                    Err(e) => error!(path = %path, "cannot open event feed: {}", e),
                }
            }
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

/// Factory for creating JSON-lines event sources from configuration
pub struct JsonLinesFactory;

impl EventSourceFactory for JsonLinesFactory {
    fn create(&self, config: &EventSourceConfig) -> Result<Box<dyn ContainerEventSource>> {
        match config {
            EventSourceConfig::JsonLines { path } => {
                Ok(Box::new(JsonLinesEventSource::new(path)))
            }
            other => Err(Error::invalid_input(format!(
                "json_lines factory cannot build a '{}' event source",
                other.type_name()
            ))),
        }
    }
}

/// Register the JSON-lines factory with a registry
pub fn register(registry: &RegistrarRegistry) {
    registry.register_event_source("json_lines", Box::new(JsonLinesFactory));
}
