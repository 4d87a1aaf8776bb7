//! Plugin-based registrar registry
//!
//! The registry allows registrar backends and event sources to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! // In dockdns-registrar-namecheap
//! pub fn register(registry: &RegistrarRegistry) {
//!     registry.register_registrar("namecheap", Box::new(NamecheapFactory));
//! }
//! ```

use crate::config::{EventSourceConfig, RegistrarConfig};
use crate::error::{Error, Result};
use crate::traits::{ContainerEventSource, EventSourceFactory, Registrar, RegistrarFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry for plugin-based registrar and event source creation
///
/// The registry maintains a map of type names to factory objects, allowing
/// dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// Uses interior mutability with RwLock, allowing concurrent reads and
/// exclusive writes.
#[derive(Default)]
pub struct RegistrarRegistry {
    /// Registered registrar factories
    registrars: RwLock<HashMap<String, Box<dyn RegistrarFactory>>>,

    /// Registered event source factories
    event_sources: RwLock<HashMap<String, Box<dyn EventSourceFactory>>>,
}

impl RegistrarRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a registrar factory under a type name
    pub fn register_registrar(&self, name: impl Into<String>, factory: Box<dyn RegistrarFactory>) {
        let name = name.into();
        let mut registrars = self.registrars.write().unwrap();
        registrars.insert(name, factory);
    }

    /// Register an event source factory under a type name
    pub fn register_event_source(
        &self,
        name: impl Into<String>,
        factory: Box<dyn EventSourceFactory>,
    ) {
        let name = name.into();
        let mut sources = self.event_sources.write().unwrap();
        sources.insert(name, factory);
    }

    /// Create a registrar from configuration
    ///
    /// Fails if the configuration's type name is not registered or the
    /// factory rejects the configuration.
    pub fn create_registrar(&self, config: &RegistrarConfig) -> Result<Box<dyn Registrar>> {
        let registrar_type = config.type_name();
        let registrars = self.registrars.read().unwrap();

        let factory = registrars
            .get(registrar_type)
            .ok_or_else(|| Error::config_missing(format!("unknown registrar type: {}", registrar_type)))?;

        factory.create(config)
    }

    /// Create an event source from configuration
    pub fn create_event_source(
        &self,
        config: &EventSourceConfig,
    ) -> Result<Box<dyn ContainerEventSource>> {
        let source_type = config.type_name();
        let sources = self.event_sources.read().unwrap();

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config_missing(format!("unknown event source type: {}", source_type)))?;

        factory.create(config)
    }

    /// List all registered registrar types
    pub fn list_registrars(&self) -> Vec<String> {
        let registrars = self.registrars.read().unwrap();
        registrars.keys().cloned().collect()
    }

    /// List all registered event source types
    pub fn list_event_sources(&self) -> Vec<String> {
        let sources = self.event_sources.read().unwrap();
        sources.keys().cloned().collect()
    }

    /// Check if a registrar type is registered
    pub fn has_registrar(&self, name: &str) -> bool {
        let registrars = self.registrars.read().unwrap();
        registrars.contains_key(name)
    }

    /// Check if an event source type is registered
    pub fn has_event_source(&self, name: &str) -> bool {
        let sources = self.event_sources.read().unwrap();
        sources.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockRegistrarFactory;

    impl RegistrarFactory for MockRegistrarFactory {
        fn create(&self, _config: &RegistrarConfig) -> Result<Box<dyn Registrar>> {
            Err(Error::Other("mock registrar not implemented".to_string()))
        }
    }

    #[test]
    fn registry_registration() {
        let registry = RegistrarRegistry::new();

        // Initially empty
        assert!(!registry.has_registrar("mock"));

        // Register
        registry.register_registrar("mock", Box::new(MockRegistrarFactory));

        // Now present
        assert!(registry.has_registrar("mock"));
        assert!(registry.list_registrars().contains(&"mock".to_string()));
    }

    #[test]
    fn unknown_type_fails_creation() {
        let registry = RegistrarRegistry::new();
        let config = RegistrarConfig::Custom {
            factory: "nope".to_string(),
            config: serde_json::json!({}),
        };

        assert!(matches!(
            registry.create_registrar(&config),
            Err(Error::ConfigMissing(_))
        ));
    }
}
