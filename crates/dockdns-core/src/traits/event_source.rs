// # Container Event Source Trait
//
// Defines the interface for consuming container lifecycle events.
//
// ## Implementations
//
// - JSON-lines feed: `dockdns-events-json` crate
// - Test doubles: channel-backed sources in the contract tests
//
// ## Contract
//
// The feed is a live subscription: a lazy, unbounded, non-restartable
// sequence of events in the order the runtime delivered them. It is not a
// replayable log. Reconnection and backoff for the feed itself belong to
// the implementation or to external glue, never to the dispatcher.

use std::collections::HashMap;
use std::pin::Pin;
use tokio_stream::Stream;

/// What happened to the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    /// The container started; the only action the dispatcher acts on
    Start,
    /// Any other lifecycle action (stop, die, destroy, ...)
    Other(String),
}

impl EventAction {
    /// Map a runtime action label onto the enum
    pub fn from_label(label: &str) -> Self {
        if label == "start" {
            EventAction::Start
        } else {
            EventAction::Other(label.to_string())
        }
    }
}

/// A single container lifecycle event.
///
/// Immutable, consumed once. The environment travels with the event so the
/// dispatcher never has to reach back into the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// The lifecycle action
    pub action: EventAction,
    /// Runtime identifier of the container
    pub container_id: String,
    /// The container's environment as ordered "KEY=VALUE" strings
    pub environment: Vec<String>,
}

impl LifecycleEvent {
    /// Create a new lifecycle event
    pub fn new(
        action: EventAction,
        container_id: impl Into<String>,
        environment: Vec<String>,
    ) -> Self {
        Self {
            action,
            container_id: container_id.into(),
            environment,
        }
    }

    /// Parse the environment list into a typed map.
    ///
    /// Entries split at the first `=`; entries without one are ignored.
    /// Later entries win on duplicate keys. Lookup is by exact key, never
    /// by substring matching.
    pub fn env_map(&self) -> HashMap<&str, &str> {
        self.environment
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .collect()
    }
}

/// Trait for container event source implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
pub trait ContainerEventSource: Send + Sync {
    /// Open the live event subscription.
    ///
    /// The returned stream yields events until the feed closes. It is not
    /// restartable: once the stream ends, a fresh subscription requires a
    /// new source.
    fn subscribe(&self) -> Pin<Box<dyn Stream<Item = LifecycleEvent> + Send + 'static>>;
}

/// Helper trait for constructing event sources from configuration
pub trait EventSourceFactory: Send + Sync {
    /// Create a ContainerEventSource instance from configuration
    fn create(
        &self,
        config: &crate::config::EventSourceConfig,
    ) -> Result<Box<dyn ContainerEventSource>, crate::Error>;
}
