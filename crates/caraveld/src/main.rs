//! caraveld — the Caravel daemon.
//!
//! Single binary assembling the control plane subsystems:
//! - State store (redb)
//! - Provider registry + liveness sweep
//! - Deployment lifecycle manager
//!
//! # Usage
//!
//! ```text
//! caraveld standalone --data-dir /var/lib/caravel
//! ```
//!
//! Standalone mode wires an in-process provider over the in-memory
//! backend — a single-node development setup with no remote transport.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use caravel_api::ProviderApi;
use caravel_backend::MemoryBackend;
use caravel_core::{Provider, ProviderState, epoch_secs};
use caravel_manager::Manager;
use caravel_provider::{ProviderEngine, ProviderSettings};
use caravel_registry::ProviderRegistry;
use caravel_state::StateStore;

#[derive(Parser)]
#[command(name = "caraveld", about = "Caravel daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run manager and a local provider in one process (single-node dev).
    Standalone {
        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/caravel")]
        data_dir: PathBuf,

        /// Provider settings TOML file (defaults when omitted).
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Liveness sweep interval in seconds.
        #[arg(long, default_value = "10")]
        heartbeat_interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,caraveld=debug,caravel=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            data_dir,
            settings,
            heartbeat_interval,
        } => run_standalone(data_dir, settings, heartbeat_interval).await,
    }
}

async fn run_standalone(
    data_dir: PathBuf,
    settings_path: Option<PathBuf>,
    heartbeat_interval: u64,
) -> anyhow::Result<()> {
    info!("Caravel daemon starting in standalone mode");

    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("caravel.redb");

    // ── Initialize subsystems ──────────────────────────────────────

    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let settings = match &settings_path {
        Some(path) => ProviderSettings::from_file(path)?,
        None => ProviderSettings::default(),
    };
    info!(hostname = %settings.cluster_public_hostname, "provider settings loaded");

    let registry = Arc::new(
        ProviderRegistry::new()
            .with_heartbeat_interval(Duration::from_secs(heartbeat_interval)),
    );
    let manager = Manager::new(store, registry.clone());

    // Local in-process provider over the in-memory backend.
    let backend = Arc::new(MemoryBackend::new());
    let engine = ProviderEngine::new(backend, settings)
        .map_err(|e| anyhow::anyhow!("provider engine: {e}"))?;
    let handle: Arc<dyn ProviderApi> = Arc::new(engine);

    let now = epoch_secs();
    manager
        .provider_connect(
            Provider {
                id: "local".to_string(),
                owner: "caraveld".to_string(),
                host_uri: "local://standalone".to_string(),
                ip: "127.0.0.1".to_string(),
                state: ProviderState::Online,
                created_at: now,
                updated_at: now,
            },
            handle,
        )
        .await
        .map_err(|e| anyhow::anyhow!("connecting local provider: {e}"))?;
    info!("local provider connected");

    // ── Background tasks ───────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_registry = registry.clone();
    let sweep_handle = tokio::spawn(async move {
        sweep_registry.run(shutdown_rx).await;
    });

    info!("Caravel daemon ready");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = sweep_handle.await;

    info!("Caravel daemon stopped");
    Ok(())
}
