use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{DEFAULT_HOST, DEFAULT_PORT, ServiceConfig};
use crate::resolve::RegistryClient;
use crate::server::{self, AppState};
use crate::store::EventStore;
use crate::sweep::spawn_sweeper;

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "EVENTLOG_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "CLEANUP_INTERVAL", default_value_t = 60)]
    pub cleanup_interval_secs: u64,
}

pub fn run(args: &ServeArgs, config: &ServiceConfig) -> Result<()> {
    let mut config = config.clone();
    config.cleanup_interval = Duration::from_secs(args.cleanup_interval_secs);
    config.validate()?;

    let bind = format!("{}:{}", args.host, args.port)
        .parse::<SocketAddr>()
        .map_err(|error| anyhow!("invalid bind address {}:{}: {error}", args.host, args.port))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(serve(bind, config))
}

async fn serve(bind: SocketAddr, config: ServiceConfig) -> Result<()> {
    let db_path = config.paths.require_db_path()?;
    let store = EventStore::open(db_path, config.pool_size)?;
    let registry = RegistryClient::new(config.registry_timeout)?;
    let output_dir = config.paths.output_dir.clone();
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    info!(
        db_path = %db_path.display(),
        output_dir = %output_dir.display(),
        pool_size = store.pool_size(),
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        cleanup_max_age_secs = config.cleanup_max_age.as_secs(),
        "starting event log export service"
    );

    let sweeper = spawn_sweeper(
        output_dir.clone(),
        config.cleanup_interval,
        config.cleanup_max_age,
    );
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    let state = AppState::new(store, output_dir, registry);
    let served = server::serve(listener, state, shutdown_signal()).await;
    sweeper.abort();
    served.context("http server failed")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
