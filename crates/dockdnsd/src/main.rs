// # dockdnsd
//
// Thin daemon shell around dockdns-core: configuration, logging,
// provider construction, and the reconcile driver loop. All
// reconciliation logic lives in the library.
//
// ## Configuration
//
// A JSON config file (providers, label prefix, reconcile interval) plus
// environment overrides:
//
// - `DOCKDNS_CONFIG`: path to the JSON configuration file
// - `DOCKDNS_LABEL_PREFIX`: label namespace prefix (default `caddy_dns`)
// - `DOCKDNS_RECONCILE_INTERVAL_SECS`: seconds between full passes
// - `DOCKDNS_DOCKER_SOCKET`: container runtime socket path
// - `DOCKDNS_WORKLOADS_FILE`: path to a JSON array of workload
//   descriptors, re-read every pass (stand-in for a runtime client)
// - `DOCKDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DOCKDNS_CONFIG=/etc/dockdns/config.json
// export DOCKDNS_WORKLOADS_FILE=/var/lib/dockdns/workloads.json
// export DOCKDNS_LOG_LEVEL=info
//
// dockdnsd
// ```

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use dockdns_core::config::Config;
use dockdns_core::driver::{Driver, WorkloadSource};
use dockdns_core::manager::Manager;
use dockdns_core::provider::Provider;
use dockdns_core::record::Workload;
use dockdns_core::watcher::Event;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes following systemd conventions
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings assembled from env + config file
struct Settings {
    config: Config,
    workloads_file: PathBuf,
    log_level: String,
}

impl Settings {
    fn from_env() -> Result<Self> {
        let mut config = match env::var("DOCKDNS_CONFIG") {
            Ok(path) if !path.is_empty() => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse config file {path}"))?
            }
            _ => Config::default(),
        };

        config.apply_env()?;
        config.validate()?;

        let workloads_file = env::var("DOCKDNS_WORKLOADS_FILE")
            .context("DOCKDNS_WORKLOADS_FILE is required")?
            .into();

        Ok(Self {
            config,
            workloads_file,
            log_level: env::var("DOCKDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => anyhow::bail!(
                "DOCKDNS_LOG_LEVEL {other:?} is not valid. \
                Valid levels: trace, debug, info, warn, error"
            ),
        }
    }
}

/// Workload source backed by a JSON file of workload descriptors.
///
/// The file is re-read on every reconcile pass, so an external agent (or
/// an operator) can update it while the daemon runs. A real container
/// runtime client implements [`WorkloadSource`] the same way.
struct FileWorkloadSource {
    path: PathBuf,
}

#[async_trait::async_trait]
impl WorkloadSource for FileWorkloadSource {
    async fn workloads(&self) -> dockdns_core::Result<Vec<Workload>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            dockdns_core::Error::watcher(format!(
                "failed to read workloads file {}: {e}",
                self.path.display()
            ))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            dockdns_core::Error::watcher(format!(
                "failed to parse workloads file {}: {e}",
                self.path.display()
            ))
        })
    }
}

/// Build providers from the validated configuration.
fn build_providers(config: &Config) -> Result<Vec<Provider>> {
    let mut providers = Vec::with_capacity(config.providers.len());

    for provider_cfg in &config.providers {
        match provider_cfg.kind.as_str() {
            #[cfg(feature = "cloudflare")]
            "cloudflare" => {
                providers.push(dockdns_provider_cloudflare::provider_from_config(
                    provider_cfg,
                )?);
            }
            other => anyhow::bail!(
                "provider {:?} has unsupported type {other:?}",
                provider_cfg.name
            ),
        }
    }

    Ok(providers)
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return DaemonExitCode::ConfigError.into();
        }
    };

    let log_level = match settings.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return DaemonExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting dockdnsd");
    info!(
        providers = settings.config.providers.len(),
        label_prefix = %settings.config.label_prefix,
        "configuration loaded"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(settings).await {
            error!("Daemon error: {e:#}");
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

async fn run_daemon(settings: Settings) -> Result<()> {
    let providers = build_providers(&settings.config)?;
    for provider in &providers {
        info!(
            name = provider.name(),
            kind = provider.kind(),
            zones = ?provider.zone_filters(),
            "provider registered"
        );
    }

    let manager = Arc::new(Manager::new(providers));
    let source = FileWorkloadSource {
        path: settings.workloads_file.clone(),
    };

    let driver = Driver::new(
        manager,
        source,
        settings.config.label_prefix.clone(),
        Duration::from_secs(settings.config.reconcile_interval_secs),
    );

    // The container-runtime event feed plugs into this channel; until one
    // is wired, the sender stays idle and the driver runs timer-only.
    let (_event_tx, event_rx) = tokio::sync::mpsc::channel::<Event>(64);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal_name) => info!("Received {signal_name}, shutting down"),
            Err(e) => error!("Shutdown signal handling failed: {e}"),
        }
        let _ = shutdown_tx.send(());
    });

    driver.run_with_shutdown(event_rx, Some(shutdown_rx)).await?;
    info!("dockdnsd stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGTERM handler: {e}"))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGINT handler: {e}"))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(name)
}

/// Fallback for non-Unix platforms: SIGINT only.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to wait for CTRL-C: {e}"))?;
    Ok("SIGINT")
}
