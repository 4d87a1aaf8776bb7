// # dockdns-core
//
// Core library for container-driven DNS registration.
//
// ## Architecture Overview
//
// This library provides the core functionality for publishing DNS records
// when containers start:
// - **ContainerEventSource**: Trait for consuming container lifecycle events
// - **Registrar**: Trait for reading and replacing a domain's host record set
// - **Reconciler**: Makes a single FQDN's A-record match a desired target IP
// - **Dispatcher**: Turns the event feed into reconcile invocations
// - **RegistrarRegistry**: Plugin-based registry for registrar backends
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Event-Driven**: Lifecycle events arrive as an async stream
// 3. **Plugin-Based**: Registrars are registered dynamically, no hard-coded if-else
// 4. **Registrar-Authoritative**: Record sets are fetched fresh for every
//    reconcile; the registrar is the sole source of truth and nothing is cached

pub mod traits;
pub mod reconcile;
pub mod dispatch;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{ContainerEventSource, DomainKey, HostRecord, LifecycleEvent, Registrar};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use dispatch::{DesiredBinding, DispatchEvent, Dispatcher};
pub use registry::RegistrarRegistry;
pub use config::{DockdnsConfig, EngineConfig, EventSourceConfig, RegistrarConfig};
pub use error::{Error, Result};
