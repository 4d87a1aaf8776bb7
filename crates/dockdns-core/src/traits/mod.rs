//! Core traits for dockdns
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ContainerEventSource`]: Consume container lifecycle events
//! - [`Registrar`]: Read and replace a domain's host record set

pub mod event_source;
pub mod registrar;

pub use event_source::{ContainerEventSource, EventAction, EventSourceFactory, LifecycleEvent};
pub use registrar::{
    DEFAULT_MX_PREF, DEFAULT_TTL, DomainKey, HostRecord, RecordType, Registrar, RegistrarFactory,
};
