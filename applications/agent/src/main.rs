/// Meterline Agent - host-scheduled background sync pass
use clap::{Parser, Subcommand, ValueEnum};
use meterline_agent::config::AgentConfig;
use meterline_client::{BackendConfig, FileTokenSource, HttpBulkTransport};
use meterline_core::types::{ConnectionClass, DeviceInfo};
use meterline_store::maintenance;
use meterline_sync::{
    SharedConnectivity, StateManager, SyncContext, SyncError, SyncManager, SyncTrigger,
    TokioSleeper,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "meterline-agent")]
#[command(about = "Background sync agent for the Meterline field app", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass and exit (non-zero exit asks the host to retry)
    Run {
        /// Connection class reported by the host scheduler
        #[arg(long, value_enum, default_value_t = Connection::Wifi)]
        connection: Connection,
    },
    /// Print local store and sync state as JSON
    Status,
}

/// CLI mirror of [`ConnectionClass`].
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Connection {
    Offline,
    Cellular,
    Wifi,
}

impl From<Connection> for ConnectionClass {
    fn from(value: Connection) -> Self {
        match value {
            Connection::Offline => Self::Offline,
            Connection::Cellular => Self::Cellular,
            Connection::Wifi => Self::Wifi,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meterline_agent=info,meterline_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AgentConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Run { connection } => run_once(&config, connection.into()).await,
        Commands::Status => status(&config).await,
    }
}

async fn run_once(config: &AgentConfig, connection: ConnectionClass) -> anyhow::Result<()> {
    let pool = meterline_store::create_pool(&config.storage.database_url).await?;
    meterline_store::run_migrations(&pool).await?;

    let stats = maintenance::storage_stats(&pool).await?;
    if stats.pending_readings == 0 && stats.pending_exceptions == 0 {
        tracing::info!("Nothing pending, agent pass skipped");
        return Ok(());
    }

    if !connection.is_online() {
        tracing::info!("Host reports offline, agent pass skipped");
        return Ok(());
    }

    tracing::info!(
        pending_readings = stats.pending_readings,
        pending_exceptions = stats.pending_exceptions,
        connection = connection.as_str(),
        "Starting background sync pass"
    );

    let tokens = Arc::new(FileTokenSource::new(config.backend.token_file.clone()));
    let transport = Arc::new(HttpBulkTransport::new(
        BackendConfig::new(config.backend.url.clone()),
        tokens,
    )?);

    let manager = SyncManager::new(
        pool,
        transport,
        Arc::new(SharedConnectivity::new(connection)),
        Arc::new(TokioSleeper),
        config.sync_config(),
        SyncContext {
            operator_id: config.operator.id.clone(),
            device: agent_device(),
        },
    );

    match manager.sync_all(SyncTrigger::BackgroundAgent).await {
        Ok(summary) => {
            tracing::info!(
                readings = summary.readings_synced,
                exceptions = summary.exceptions_synced,
                failed = summary.failed_readings,
                "Background sync pass completed"
            );

            let removed = manager.run_retention().await?;
            if removed > 0 {
                tracing::info!(removed, "Removed synced records past retention");
            }

            Ok(())
        }
        // Another sync holds the guard; its outcome will land in
        // sync_state, so this pass has nothing left to do.
        Err(SyncError::AlreadySyncing) => {
            tracing::info!("A sync is already running, agent pass skipped");
            Ok(())
        }
        // The failure is already recorded in sync_state; the non-zero
        // exit asks the host scheduler for a retry.
        Err(e) => Err(e.into()),
    }
}

async fn status(config: &AgentConfig) -> anyhow::Result<()> {
    let pool = meterline_store::create_pool(&config.storage.database_url).await?;
    meterline_store::run_migrations(&pool).await?;

    let stats = maintenance::storage_stats(&pool).await?;
    let state = StateManager::new(pool).snapshot().await?;

    let report = serde_json::json!({
        "store": {
            "total_readings": stats.total_readings,
            "pending_readings": stats.pending_readings,
            "pending_exceptions": stats.pending_exceptions,
            "cached_meters": stats.meter_count,
        },
        "sync": {
            "last_sync_at": state.last_sync_at.map(|t| t.to_rfc3339()),
            "last_error": state.last_error,
            "last_pushed_readings": state.last_pushed_readings,
            "last_pushed_exceptions": state.last_pushed_exceptions,
            "last_failed_readings": state.last_failed_readings,
        },
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn agent_device() -> DeviceInfo {
    DeviceInfo {
        platform: std::env::consts::OS.to_string(),
        user_agent: format!("meterline-agent/{}", env!("CARGO_PKG_VERSION")),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
