// # dockdnsd - container DNS publication daemon
//
// A thin integration layer: all reconciliation and dispatch logic lives in
// dockdns-core, all wire handling in the registrar crates. This binary only
// reads configuration, registers backends, and starts the dispatcher.
//
// ## Modes
//
// - Daemon (no arguments): consume the lifecycle event feed and reconcile
//   every actionable start event until the feed closes or a signal arrives.
// - One-shot (exactly three arguments): reconcile a single binding and
//   exit, e.g. `dockdnsd app.example.com namecheap 203.0.113.7`.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Registrar
// - `DOCKDNS_REGISTRAR`: registrar backend type (namecheap)
// - `DOCKDNS_NC_USERNAME`: Namecheap account username
// - `DOCKDNS_NC_API_KEY`: Namecheap API key
// - `DOCKDNS_NC_CLIENT_IP`: IP allowlisted for API access
// - `DOCKDNS_NC_ENDPOINT`: API endpoint override (optional; sandbox)
// - `DOCKDNS_ATTEMPTS`: transport attempts per call (default 1)
// - `DOCKDNS_ATTEMPT_DELAY_MS`: delay between attempts (default 100)
//
// ### Event feed
// - `DOCKDNS_EVENTS_PATH`: feed path, "-" for stdin (default "-")
//
// ### Misc
// - `DOCKDNS_EVENT_CHANNEL_CAPACITY`: observability channel size
// - `DOCKDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DOCKDNS_REGISTRAR=namecheap
// export DOCKDNS_NC_USERNAME=acme
// export DOCKDNS_NC_API_KEY=your_key
// export DOCKDNS_NC_CLIENT_IP=203.0.113.9
//
// docker events --format '{{json .}}' | normalize-events | dockdnsd
// ```

use anyhow::Result;
use dockdns_core::config::{EngineConfig, EventSourceConfig, RegistrarConfig};
use dockdns_core::traits::Registrar;
use dockdns_core::{DispatchEvent, Dispatcher, ReconcileOutcome, Reconciler, RegistrarRegistry};
use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DockdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DockdnsExitCode> for ExitCode {
    fn from(code: DockdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    registrar_type: String,
    nc_username: String,
    nc_api_key: String,
    nc_client_ip: String,
    nc_endpoint: Option<String>,
    attempts: u32,
    attempt_delay_ms: u64,
    events_path: String,
    event_channel_capacity: Option<usize>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            registrar_type: env::var("DOCKDNS_REGISTRAR")
                .unwrap_or_else(|_| "namecheap".to_string())
                .to_lowercase(),
            nc_username: env::var("DOCKDNS_NC_USERNAME").unwrap_or_default(),
            nc_api_key: env::var("DOCKDNS_NC_API_KEY").unwrap_or_default(),
            nc_client_ip: env::var("DOCKDNS_NC_CLIENT_IP").unwrap_or_default(),
            nc_endpoint: env::var("DOCKDNS_NC_ENDPOINT").ok(),
            attempts: env::var("DOCKDNS_ATTEMPTS")
                .ok()
                .map(|s| s.parse().unwrap_or(1))
                .unwrap_or(1),
            attempt_delay_ms: env::var("DOCKDNS_ATTEMPT_DELAY_MS")
                .ok()
                .map(|s| s.parse().unwrap_or(100))
                .unwrap_or(100),
            events_path: env::var("DOCKDNS_EVENTS_PATH").unwrap_or_else(|_| "-".to_string()),
            event_channel_capacity: env::var("DOCKDNS_EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok()),
            log_level: env::var("DOCKDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.registrar_type.as_str() {
            "namecheap" => {}
            other => anyhow::bail!(
                "DOCKDNS_REGISTRAR '{}' is not supported. Supported registrars: namecheap",
                other
            ),
        }

        if self.nc_username.is_empty() {
            anyhow::bail!(
                "DOCKDNS_NC_USERNAME is required. \
                Set it via: export DOCKDNS_NC_USERNAME=your_username"
            );
        }

        if self.nc_api_key.is_empty() {
            anyhow::bail!(
                "DOCKDNS_NC_API_KEY is required. \
                Set it via: export DOCKDNS_NC_API_KEY=your_key"
            );
        }

        // Check for obvious placeholder keys (common mistake)
        let key_lower = self.nc_api_key.to_lowercase();
        if key_lower.contains("your_key") || key_lower.contains("replace_me") {
            anyhow::bail!(
                "DOCKDNS_NC_API_KEY appears to be a placeholder. \
                Use an actual API key from the registrar's dashboard."
            );
        }

        if self.nc_client_ip.parse::<std::net::IpAddr>().is_err() {
            anyhow::bail!(
                "DOCKDNS_NC_CLIENT_IP '{}' is not an IP address. \
                It must match the IP allowlisted for API access.",
                self.nc_client_ip
            );
        }

        if self.attempts == 0 || self.attempts > 10 {
            anyhow::bail!(
                "DOCKDNS_ATTEMPTS must be between 1 and 10. Got: {}",
                self.attempts
            );
        }

        if self.events_path.is_empty() {
            anyhow::bail!("DOCKDNS_EVENTS_PATH cannot be empty (use '-' for stdin)");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DOCKDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// The registrar credential bundle this configuration describes
    fn registrar_config(&self) -> RegistrarConfig {
        RegistrarConfig::Namecheap {
            username: self.nc_username.clone(),
            api_key: self.nc_api_key.clone(),
            client_ip: self.nc_client_ip.clone(),
            endpoint: self.nc_endpoint.clone(),
            attempts_count: self.attempts,
            attempts_delay_ms: self.attempt_delay_ms,
        }
    }

    fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::default();
        if let Some(capacity) = self.event_channel_capacity {
            engine.event_channel_capacity = capacity;
        }
        engine
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DockdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DockdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DockdnsExitCode::ConfigError.into();
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DockdnsExitCode::RuntimeError.into();
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();

    rt.block_on(async {
        let result = match args.as_slice() {
            [] => run_daemon(config).await,
            [fqdn, registrar, ip] => run_one_shot(config, fqdn, registrar, ip).await,
            _ => {
                eprintln!("Usage: dockdnsd [<fqdn> <registrar> <ip>]");
                return DockdnsExitCode::ConfigError;
            }
        };

        match result {
            Ok(()) => DockdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {}", e);
                DockdnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the registry and register the enabled backends
fn build_registry() -> RegistrarRegistry {
    let registry = RegistrarRegistry::new();

    #[cfg(feature = "namecheap")]
    {
        debug!("Registering Namecheap registrar");
        dockdns_registrar_namecheap::register(&registry);
    }

    #[cfg(feature = "json-events")]
    {
        debug!("Registering JSON-lines event source");
        dockdns_events_json::register(&registry);
    }

    registry
}

/// Reconcile a single binding and exit
async fn run_one_shot(config: Config, fqdn: &str, registrar_id: &str, ip: &str) -> Result<()> {
    let registrar_id = registrar_id.to_lowercase();
    if registrar_id != config.registrar_type {
        anyhow::bail!(
            "registrar '{}' is not configured (configured: {})",
            registrar_id,
            config.registrar_type
        );
    }

    let target_ip: std::net::IpAddr = ip
        .parse()
        .map_err(|_| anyhow::anyhow!("'{}' is not an IP address", ip))?;

    let registry = build_registry();
    let registrar: Arc<dyn Registrar> =
        Arc::from(registry.create_registrar(&config.registrar_config())?);

    info!("Reconciling {} -> {} via {}", fqdn, target_ip, registrar_id);

    let outcome = Reconciler::new(registrar)
        .ensure_binding(fqdn, target_ip)
        .await?;

    match outcome {
        ReconcileOutcome::Unchanged { current_ip } => {
            println!("{}: already points at {}", fqdn, current_ip);
        }
        ReconcileOutcome::Created => {
            println!("{}: record created -> {}", fqdn, target_ip);
        }
        ReconcileOutcome::Replaced { previous_ip } => {
            println!("{}: {} replaced by {}", fqdn, previous_ip, target_ip);
        }
    }

    Ok(())
}

/// Run the dispatcher over the event feed until it closes
async fn run_daemon(config: Config) -> Result<()> {
    info!("Starting dockdnsd daemon");

    let registry = build_registry();

    let registrar: Arc<dyn Registrar> =
        Arc::from(registry.create_registrar(&config.registrar_config())?);

    let mut registrars: HashMap<String, Arc<dyn Registrar>> = HashMap::new();
    registrars.insert(config.registrar_type.clone(), registrar);

    let events_config = EventSourceConfig::JsonLines {
        path: config.events_path.clone(),
    };
    let event_source = registry.create_event_source(&events_config)?;

    info!(
        "Consuming event feed from '{}' for registrar '{}'",
        config.events_path, config.registrar_type
    );

    let (dispatcher, mut dispatch_rx) =
        Dispatcher::new(event_source, registrars, &config.engine_config());

    // Surface dispatch events in the logs
    let monitor = tokio::spawn(async move {
        while let Some(event) = dispatch_rx.recv().await {
            match &event {
                DispatchEvent::BindingFailed { fqdn, error } => {
                    warn!("binding failed for {}: {}", fqdn, error);
                }
                DispatchEvent::BindingApplied { fqdn, outcome } => {
                    info!("binding applied for {}: {:?}", fqdn, outcome);
                }
                other => debug!("dispatch event: {:?}", other),
            }
        }
    });

    dispatcher.run().await?;
    monitor.abort();

    info!("Shutting down daemon");
    Ok(())
}
