//! Event dispatcher
//!
//! The Dispatcher turns the container lifecycle event feed into reconcile
//! invocations:
//!
//! ```text
//! ┌─────────────────────┐
//! │ ContainerEventSource│─── LifecycleEvent ───┐
//! └─────────────────────┘                      │
//!                                              ▼
//!                                     ┌──────────────┐
//!                                     │  Dispatcher  │
//!                                     └──────────────┘
//!                                              │
//!                      ┌───────────────────────┼────────────────────┐
//!                      │                       │                    │
//!                      ▼                       ▼                    ▼
//!              ┌──────────────┐        ┌──────────────┐      ┌─────────────┐
//!              │ env parsing  │        │  Reconciler  │      │   Events    │
//!              │ (bindings)   │        │ (per FQDN)   │      │  (notify)   │
//!              └──────────────┘        └──────────────┘      └─────────────┘
//! ```
//!
//! Events are handled strictly in the order the feed delivers them; there
//! is no concurrent event processing within one process. A failure in one
//! `ensure_binding` call never prevents processing of subsequent FQDNs in
//! the same event or of subsequent events.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::traits::{ContainerEventSource, EventAction, LifecycleEvent, Registrar};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Environment variable naming the comma-separated FQDN list
pub const ENV_VIRTUAL_HOST: &str = "VIRTUAL_HOST";
/// Environment variable naming the registrar dispatch key
pub const ENV_REGISTRAR: &str = "REGISTRAR";
/// Environment variable naming the target IP
pub const ENV_EXTERNAL_IP: &str = "EXTERNAL_IP";

/// A single desired (FQDN, registrar, target IP) triple.
///
/// Ephemeral: created per event, consumed by one reconcile call, discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredBinding {
    /// Fully-qualified domain name to publish
    pub fqdn: String,
    /// Lower-cased registrar dispatch key
    pub registrar_id: String,
    /// Address the A-record should point at
    pub target_ip: IpAddr,
}

impl DesiredBinding {
    /// Extract the desired bindings from a lifecycle event's environment.
    ///
    /// Returns an empty list when any of `VIRTUAL_HOST`, `REGISTRAR` or
    /// `EXTERNAL_IP` is absent or empty (the event is simply not
    /// actionable). Fails only when `EXTERNAL_IP` is present but does not
    /// parse as an IP address.
    ///
    /// The `VIRTUAL_HOST` list splits on commas as-is: duplicates and empty
    /// entries are not filtered. Known gap, kept deliberately.
    pub fn from_event(event: &LifecycleEvent) -> Result<Vec<DesiredBinding>> {
        let env = event.env_map();

        let virtual_host = env.get(ENV_VIRTUAL_HOST).copied().unwrap_or_default();
        let registrar = env.get(ENV_REGISTRAR).copied().unwrap_or_default();
        let external_ip = env.get(ENV_EXTERNAL_IP).copied().unwrap_or_default();

        if virtual_host.is_empty() || registrar.is_empty() || external_ip.is_empty() {
            return Ok(Vec::new());
        }

        let target_ip: IpAddr = external_ip.parse().map_err(|_| {
            crate::Error::invalid_input(format!(
                "{}='{}' is not an IP address",
                ENV_EXTERNAL_IP, external_ip
            ))
        })?;

        let registrar_id = registrar.to_lowercase();

        Ok(virtual_host
            .split(',')
            .map(|fqdn| DesiredBinding {
                fqdn: fqdn.to_string(),
                registrar_id: registrar_id.clone(),
                target_ip,
            })
            .collect())
    }
}

/// Events emitted by the Dispatcher for external monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Dispatcher started consuming the feed
    Started,

    /// A start event was received
    ContainerSeen {
        container_id: String,
    },

    /// An event carried no actionable binding (or an unknown registrar)
    EventSkipped {
        container_id: String,
        reason: String,
    },

    /// One binding was reconciled
    BindingApplied {
        fqdn: String,
        outcome: ReconcileOutcome,
    },

    /// One binding failed; later bindings were still processed
    BindingFailed {
        fqdn: String,
        error: String,
    },

    /// Dispatcher stopped
    Stopped {
        reason: String,
    },
}

/// Consumes the lifecycle event feed and invokes the reconciler per FQDN.
pub struct Dispatcher {
    /// Live event subscription
    events: Box<dyn ContainerEventSource>,

    /// Registrar backends keyed by lower-cased registrar id
    registrars: HashMap<String, Arc<dyn Registrar>>,

    /// Observability event sender
    event_tx: mpsc::Sender<DispatchEvent>,
}

impl Dispatcher {
    /// Create a new dispatcher.
    ///
    /// Returns a tuple of (dispatcher, event_receiver) where the receiver
    /// yields [`DispatchEvent`]s for monitoring.
    pub fn new(
        events: Box<dyn ContainerEventSource>,
        registrars: HashMap<String, Arc<dyn Registrar>>,
        engine: &EngineConfig,
    ) -> (Self, mpsc::Receiver<DispatchEvent>) {
        let (tx, rx) = mpsc::channel(engine.event_channel_capacity);

        let dispatcher = Self {
            events,
            registrars,
            event_tx: tx,
        };

        (dispatcher, rx)
    }

    /// Run the dispatcher until the feed closes or a shutdown signal arrives.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Test-only helper to run the dispatcher with a controlled shutdown
    /// signal instead of OS signals.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(DispatchEvent::Started);

        let mut events = self.events.subscribe();

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for the provided shutdown signal
            loop {
                tokio::select! {
                    event = events.next() => {
                        match event {
                            Some(event) => {
                                if let Err(e) = self.handle_event(event).await {
                                    error!("failed to handle event: {}", e);
                                }
                            }
                            None => {
                                info!("event feed closed");
                                self.emit_event(DispatchEvent::Stopped {
                                    reason: "feed closed".to_string(),
                                });
                                break;
                            }
                        }
                    }

                    _ = &mut rx => {
                        info!("shutdown signal received");
                        self.emit_event(DispatchEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT/SIGTERM
            loop {
                tokio::select! {
                    event = events.next() => {
                        match event {
                            Some(event) => {
                                if let Err(e) = self.handle_event(event).await {
                                    error!("failed to handle event: {}", e);
                                    // Continue running despite errors
                                }
                            }
                            None => {
                                info!("event feed closed");
                                self.emit_event(DispatchEvent::Stopped {
                                    reason: "feed closed".to_string(),
                                });
                                break;
                            }
                        }
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        self.emit_event(DispatchEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Handle a single lifecycle event.
    ///
    /// Non-start actions are ignored. An event missing any of the three
    /// required environment values is skipped, not fatal.
    async fn handle_event(&self, event: LifecycleEvent) -> Result<()> {
        if event.action != EventAction::Start {
            debug!(
                "ignoring {:?} for container {}",
                event.action, event.container_id
            );
            return Ok(());
        }

        self.emit_event(DispatchEvent::ContainerSeen {
            container_id: event.container_id.clone(),
        });

        let bindings = match DesiredBinding::from_event(&event) {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!("container {}: {}", event.container_id, e);
                self.emit_event(DispatchEvent::EventSkipped {
                    container_id: event.container_id.clone(),
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        if bindings.is_empty() {
            debug!(
                "container {} has no actionable binding, skipping",
                event.container_id
            );
            self.emit_event(DispatchEvent::EventSkipped {
                container_id: event.container_id.clone(),
                reason: "no actionable binding".to_string(),
            });
            return Ok(());
        }

        // All bindings of one event share the same registrar id.
        let registrar_id = &bindings[0].registrar_id;
        let Some(registrar) = self.registrars.get(registrar_id) else {
            warn!(
                "container {}: no registrar configured for '{}'",
                event.container_id, registrar_id
            );
            self.emit_event(DispatchEvent::EventSkipped {
                container_id: event.container_id.clone(),
                reason: format!("unknown registrar '{}'", registrar_id),
            });
            return Ok(());
        };

        let reconciler = Reconciler::new(Arc::clone(registrar));

        for binding in &bindings {
            match reconciler
                .ensure_binding(&binding.fqdn, binding.target_ip)
                .await
            {
                Ok(outcome) => {
                    debug!("applied binding for {}: {:?}", binding.fqdn, outcome);
                    self.emit_event(DispatchEvent::BindingApplied {
                        fqdn: binding.fqdn.clone(),
                        outcome,
                    });
                }
                Err(e) => {
                    // Failure isolation: later bindings still run.
                    error!("failed to bind {}: {}", binding.fqdn, e);
                    self.emit_event(DispatchEvent::BindingFailed {
                        fqdn: binding.fqdn.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn emit_event(&self, event: DispatchEvent) {
        // Send event, dropping it if the channel is full (backpressure)
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "dispatch event channel full, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }
}
