//! Configuration types for dockdns
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main dockdns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockdnsConfig {
    /// Registrar credential bundles, keyed by lower-cased registrar id
    pub registrars: HashMap<String, RegistrarConfig>,

    /// Event feed configuration
    pub events: EventSourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DockdnsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            registrars: HashMap::new(),
            events: EventSourceConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.registrars.is_empty() {
            return Err(crate::Error::config_missing("no registrars configured"));
        }

        for (id, registrar) in &self.registrars {
            if id != &id.to_lowercase() {
                return Err(crate::Error::invalid_input(format!(
                    "registrar id '{}' must be lower-case",
                    id
                )));
            }
            registrar.validate()?;
        }

        self.events.validate()?;

        Ok(())
    }
}

impl Default for DockdnsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Registrar credential bundle and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistrarConfig {
    /// Namecheap registrar
    Namecheap {
        /// Account username (used as both ApiUser and UserName)
        username: String,
        /// API key
        api_key: String,
        /// IP address allowlisted for API access
        client_ip: String,
        /// Override the API endpoint (sandbox, test server)
        #[serde(default)]
        endpoint: Option<String>,
        /// Transport attempts per call; 1 means no retry
        #[serde(default = "default_attempts_count")]
        attempts_count: u32,
        /// Fixed delay between attempts, in milliseconds
        #[serde(default = "default_attempts_delay_ms")]
        attempts_delay_ms: u64,
    },

    /// Custom registrar
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl RegistrarConfig {
    /// Validate the registrar configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RegistrarConfig::Namecheap {
                username,
                api_key,
                client_ip,
                attempts_count,
                ..
            } => {
                if username.is_empty() {
                    return Err(crate::Error::config_missing("namecheap username"));
                }
                if api_key.is_empty() {
                    return Err(crate::Error::config_missing("namecheap api_key"));
                }
                if client_ip.parse::<std::net::IpAddr>().is_err() {
                    return Err(crate::Error::invalid_input(format!(
                        "namecheap client_ip '{}' is not an IP address",
                        client_ip
                    )));
                }
                if *attempts_count == 0 {
                    return Err(crate::Error::invalid_input(
                        "namecheap attempts_count must be at least 1",
                    ));
                }
                Ok(())
            }
            RegistrarConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config_missing("custom registrar factory"));
                }
                if config.is_null() {
                    return Err(crate::Error::config_missing("custom registrar config"));
                }
                Ok(())
            }
        }
    }

    /// Get the registrar type name
    pub fn type_name(&self) -> &str {
        match self {
            RegistrarConfig::Namecheap { .. } => "namecheap",
            RegistrarConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Event feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventSourceConfig {
    /// Newline-delimited JSON event feed read from a path ("-" for stdin)
    JsonLines {
        /// Path to the feed (regular file, FIFO, or "-")
        path: String,
    },

    /// Custom event source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl EventSourceConfig {
    /// Validate the event source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            EventSourceConfig::JsonLines { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config_missing("event feed path"));
                }
                Ok(())
            }
            EventSourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config_missing("custom event source factory"));
                }
                if config.is_null() {
                    return Err(crate::Error::config_missing("custom event source config"));
                }
                Ok(())
            }
        }
    }

    /// Get the event source type name
    pub fn type_name(&self) -> &str {
        match self {
            EventSourceConfig::JsonLines { .. } => "json_lines",
            EventSourceConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for EventSourceConfig {
    fn default() -> Self {
        EventSourceConfig::JsonLines {
            path: "-".to_string(),
        }
    }
}

/// Dispatcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the internal observability event channel
    ///
    /// When full, new dispatch events are dropped (with a warning log).
    /// This prevents unbounded memory growth under event storms.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_attempts_count() -> u32 {
    1
}

fn default_attempts_delay_ms() -> u64 {
    100
}

fn default_event_channel_capacity() -> usize {
    1000
}
