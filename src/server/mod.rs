//! HTTP boundary for the QA service.

mod routes;

pub use routes::{AppState, router};

use anyhow::Result;
use tracing::info;

use crate::pipeline::SharedServices;

/// Bind and serve until interrupted. The vector index inside `services` must
/// already be built; nothing mutates it once serving starts.
pub async fn run_server(services: SharedServices) -> Result<()> {
    let address = format!(
        "{}:{}",
        services.config.service.host, services.config.service.port
    );
    let state = AppState { services };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, "serving requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("received shutdown signal, stopping");
}
