//! Dashboard web server.
//!
//! Serves the control page, the passage statistics and a small JSON API. The
//! dashboard never writes the passage log; it only reads what the counter
//! process appended.

pub mod config;
pub mod handlers;
pub mod pages;
pub mod router;
pub mod state;

// Re-export commonly used items
pub use config::DashboardConfig;
pub use router::create_app;
pub use state::AppState;

use crate::error::{BirdhouseError, Result};
use std::net::SocketAddr;
use tracing::{error, info};

/// Start the dashboard and serve until SIGINT or SIGTERM.
pub async fn start_web_server(config: DashboardConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let stream = state.stream.clone();
    let app = create_app(state, config.enable_cors);

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| BirdhouseError::config_error(format!("Invalid bind address: {}", e)))?;

    info!("Starting birdhouse dashboard on http://{}", addr);
    info!("Passage log: {}", config.log_path.display());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            BirdhouseError::web_server_error(format!("Failed to bind to address: {}", e))
        })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BirdhouseError::web_server_error(format!("Server error: {}", e)))?;

    // Do not leave an orphaned stream service behind
    if let Err(e) = stream.shutdown().await {
        error!("{}", e);
    }
    info!("Dashboard stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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
}
