//! Wardensync - LDAP to Vaultwarden membership sync
//!
//! Invites enabled directory users into vault organizations, revokes
//! disabled ones and restores re-enabled ones, on a fixed interval.

mod runner;

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wardensync_core::config::is_truthy;
use wardensync_core::SyncConfig;
use wardensync_ldap::LdapDirectory;
use wardensync_sync::{Synchronizer, SyncMode};
use wardensync_vault::HttpVaultConnector;

use runner::{LoopExit, RunLoop};

#[derive(Parser)]
#[command(name = "wardensync")]
#[command(author = "Wardensync Team")]
#[command(version = wardensync_core::VERSION)]
#[command(about = "Sync vault organization membership from an LDAP directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Seconds between sync cycles
    #[arg(long, env = "SYNC_INTERVAL", default_value_t = 60)]
    interval: u64,

    /// Consecutive failed cycles before the process exits
    #[arg(long, env = "MAX_CONSECUTIVE_FAILURES", default_value_t = 5)]
    max_failures: u32,

    /// Run a single cycle and exit
    #[arg(long, env = "RUN_ONCE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    once: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync loop (default)
    Run,

    /// Print the actions the next cycle would apply, as JSON
    Plan,

    /// Print the resolved configuration with secrets redacted
    CheckConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    match cli.command {
        Some(Commands::Plan) => plan().await,
        Some(Commands::CheckConfig) => check_config(),
        Some(Commands::Run) | None => run(&cli).await,
    }
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let debug = std::env::var("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false);
    let level = if debug { "debug" } else { log_level };

    // RUST_LOG wins over the flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

fn synchronizer(config: &SyncConfig) -> Synchronizer {
    Synchronizer::new(
        Arc::new(LdapDirectory::from_config(&config.directory)),
        Arc::new(HttpVaultConnector::new()),
    )
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    info!(version = wardensync_core::VERSION, "Starting wardensync");

    if let Some(addr) = cli.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .with_context(|| format!("failed to start metrics exporter on {}", addr))?;
        wardensync_sync::metrics::describe();
        info!(addr = %addr, "Metrics exporter listening");
    }

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    let run_loop = RunLoop {
        interval: Duration::from_secs(cli.interval),
        max_failures: cli.max_failures,
        once: cli.once,
    };
    info!(
        interval_secs = cli.interval,
        max_failures = cli.max_failures,
        once = cli.once,
        "Sync loop configured"
    );

    match run_loop.run(shutdown, run_cycle).await {
        LoopExit::FailureThreshold => {
            error!("Exiting after reaching the consecutive failure limit");
            std::process::exit(1);
        }
        LoopExit::Completed | LoopExit::Shutdown => {
            info!("Wardensync stopped");
            Ok(())
        }
    }
}

/// One cycle with freshly loaded configuration
async fn run_cycle() -> bool {
    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return false;
        }
    };

    match synchronizer(&config).run_cycle(&config).await {
        Ok(report) => report.is_success(),
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Sync cycle failed");
            false
        }
    }
}

async fn plan() -> anyhow::Result<()> {
    let config = SyncConfig::from_env()?;
    let report = synchronizer(&config).plan(&config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn check_config() -> anyhow::Result<()> {
    let config = SyncConfig::from_env()?;
    let mode = Synchronizer::select_mode(&config)?;

    let organizations = match mode {
        SyncMode::MultiOrg => serde_json::to_value(&config.organizations)?,
        SyncMode::Single | SyncMode::AutoDiscovery => json!({
            "configs": {
                "default": {
                    "config_id": "default",
                    "org_id": config.vault.org_id,
                    "vw_url": config.vault.url,
                    "client_id": config.vault.client_id,
                    "group_filter": config.directory.user_groups,
                    "tls_verify": config.vault.tls_verify,
                    "timeout_secs": config.vault.timeout_secs,
                }
            },
            "rejected": [],
        }),
    };

    let output = json!({
        "mode": mode,
        "directory": {
            "host": config.directory.host,
            "base_dn": config.directory.base_dn,
            "filter": config.directory.query().filter(),
            "start_tls": config.directory.start_tls,
            "tls_verify": config.directory.tls_verify,
        },
        "prevent_self_lock": config.prevent_self_lock,
        "users_only": config.users_only,
        "organizations": organizations,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing current cycle");
}
