//! disburse-daemon: serves the distribution engine over JSON-RPC.
//!
//! Single OS process running a Tokio async runtime. Clients talk to the
//! daemon with newline-delimited JSON-RPC over a Unix socket. Engine state,
//! asset balances and the event log share one SQLite database.

mod commands;
mod config;
mod engine;
mod events;
mod rpc;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
///
/// RPC callers identify themselves with a `caller` address that is not
/// authenticated; access control rests on the socket's file permissions.
pub struct DaemonState {
    /// Database connection. Engine calls serialize on this lock.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // Initialize tracing; RUST_LOG overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
                tracing_subscriber::EnvFilter::try_new(format!(
                    "disburse_core={level},disburse_db={level},disburse_daemon={level}",
                    level = config.advanced.log_level
                ))
            })?,
        )
        .init();

    info!("Disburse daemon starting");

    let data_dir = config.data_dir();

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database and create the engine on first start
    let db_path = data_dir.join("disburse.db");
    let mut conn = disburse_db::open(&db_path)?;
    if engine::bootstrap(&mut conn, &config)? {
        info!("Initialized new engine in {:?}", db_path);
    }
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    // 3. Create event bus
    let event_bus = EventBus::new(1000);

    // 4. Create shutdown channel
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 5. Build daemon state
    let socket_path = config.socket_path();
    let state = Arc::new(DaemonState {
        db,
        config,
        event_bus,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 6. Start IPC server
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 7. Emit daemon_started event
    state.event_bus.emit(events::Event {
        event_type: "daemon_started".to_string(),
        seq: 0,
        timestamp: engine::unix_now(),
        payload: serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    });

    // 8. Run the RPC server until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    info!("Daemon shutting down gracefully");

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
