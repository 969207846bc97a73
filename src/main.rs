//! redplanet - in-memory Mars dataset query server
//!
//! This is the main entry point for the redplanet application.

use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};

use redplanet::handlers::heartbeat::mark_start;
use redplanet::handlers::router;
use redplanet::{init_tracing, AppState, Config, RedPlanetError, Result};

fn main() -> Result<()> {
    mark_start();

    let config = Config::load()?;
    init_tracing(&config.log_level);

    info!("Starting redplanet v{}", env!("CARGO_PKG_VERSION"));

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if let Some(workers) = config.server.workers {
        runtime.worker_threads(workers);
    }
    let runtime = runtime.build().map_err(|e| RedPlanetError::Server {
        message: format!("Failed to start runtime: {}", e),
    })?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    let state = AppState::new_shared(config.clone())?;

    if config.data.preload {
        let registry = state.registry.clone();
        let loaded = tokio::task::spawn_blocking(move || registry.preload())
            .await
            .map_err(|e| RedPlanetError::Server {
                message: format!("Preload task failed: {}", e),
            })?
            .map_err(|e| {
                error!("Failed to preload datasets: {}", e);
                e
            })?;
        info!(datasets = ?loaded, "Datasets preloaded");
    } else {
        info!("Datasets will be loaded on first use");
    }

    for handle in redplanet::DatasetHandle::ALL {
        if !state.registry.is_configured(handle) {
            warn!(dataset = %handle, "Dataset has no configured source");
        }
    }
    if !state.registry.craters_configured() {
        warn!(dataset = redplanet::state::CRATERS, "Dataset has no configured source");
    }

    let app = router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| RedPlanetError::Config {
                message: format!("Invalid host address: {}", e),
            })?,
        config.server.port,
    ));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RedPlanetError::Server {
            message: format!("Failed to bind to address: {}", e),
        })?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RedPlanetError::Server {
            message: format!("Server error: {}", e),
        })?;

    info!("Server has been gracefully shut down");
    Ok(())
}

/// Wait for a shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
