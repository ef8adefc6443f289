//! tenantmgrd - Fabric Tenant Convergence Daemon
//!
//! Entry point for the tenantmgrd daemon.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fabric_client::HttpFabricClient;
use fabric_orch_common::{run_cycle, CancellationToken, Trigger};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tenantmgrd::config::DEFAULT_CONFIG_PATH;
use tenantmgrd::{FileSpecStore, TenantMgr, TenantMgrConfig};

/// Fabric tenant convergence controller
#[derive(Parser, Debug)]
#[command(name = "tenantmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting tenantmgrd ---");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "tenantmgrd: Exiting on error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = TenantMgrConfig::load_or_default(&args.config)?;
    config.validate()?;
    info!(
        fabric = %config.fabric.base_url,
        spec_store = %config.spec_store.path.display(),
        interval_secs = config.reconcile.interval_secs,
        "Configuration loaded"
    );

    let mut client = HttpFabricClient::new(&config.client_config())
        .context("Failed to build fabric client")?;
    match config
        .credentials()
        .context("Failed to read client credentials")?
    {
        Some(credentials) => client = client.with_credentials(credentials),
        None => warn!("No token endpoint configured, fabric requests are unauthenticated"),
    }

    let store = Arc::new(FileSpecStore::new(&config.spec_store.path));
    let mgr = TenantMgr::new(store, Arc::new(client), &config.engine_settings())?;
    let timeout = config.cycle_timeout();

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("tenantmgrd: Received SIGINT, shutting down");
            signal_token.cancel();
        }
    });

    if args.once {
        run_cycle(&mgr, &Trigger::Resync, &shutdown, timeout).await?;
        return Ok(());
    }

    let mut delay = config.resync_interval();
    loop {
        match run_cycle(&mgr, &Trigger::Resync, &shutdown, timeout).await {
            Ok(action) => delay = action.requeue_after().unwrap_or(delay),
            Err(e) if e.is_retryable() => {}
            Err(e) => warn!(error = %e, "Cycle needs operator attention"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    info!("tenantmgrd: Graceful shutdown complete");
    Ok(())
}
