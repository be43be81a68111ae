//! HTTP front end for the roadwatch routing engine

pub mod api;
pub mod config;
pub mod dto;
pub mod error;
pub mod events;
pub mod identity;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use roadwatch_core::RoutingEngine;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use api::{Limits, build_router};
pub use config::{Cli, ConfigError, ServerConfig};
pub use error::ApiError;
pub use identity::{IdentityProvider, StaticDirectory};
pub use state::AppState;

const DEFAULT_LOG_FILTER: &str = "roadwatch=info,tower_http=info";

/// Failures that stop the server from starting or running
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to load road network: {0}")]
    Engine(#[from] roadwatch_core::Error),
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Startup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter; records from the core crate's `log` macros are bridged in.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Evict expired obstacles every `every` until `shutdown` fires
pub fn spawn_compaction(
    engine: Arc<RoutingEngine>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let evicted = engine.overlay().compact(Utc::now());
                    if evicted > 0 {
                        info!(evicted, "compacted expired obstacles");
                    }
                }
            }
        }
    })
}

/// Load the road network and serve the API until Ctrl-C
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let engine_config = config.engine_config();
    let engine = tokio::task::spawn_blocking(move || RoutingEngine::load(&engine_config)).await??;
    let engine = Arc::new(engine);

    let identity = Arc::new(StaticDirectory::new(config.identity.users.clone()));
    let state = Arc::new(AppState::new(
        Arc::clone(&engine),
        identity,
        config.obstacles.max_snap_distance_m,
    ));

    let shutdown = CancellationToken::new();
    let compaction = config
        .compaction_interval()
        .map(|every| spawn_compaction(Arc::clone(&engine), every, shutdown.clone()));

    let limits = Limits {
        request_timeout: config.request_timeout(),
        concurrency_limit: config.server.concurrency_limit,
    };
    let app = build_router(state, limits);

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        nodes = engine.graph().node_count(),
        strategy = %engine.strategy(),
        "roadwatch server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if let Some(handle) = compaction {
        handle.await?;
    }
    info!("roadwatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
