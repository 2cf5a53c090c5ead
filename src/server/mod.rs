//! HTTP and WebSocket front end.
//!
//! - `GET /` liveness greeting
//! - `POST /parse` expand and store a batch of raw targets
//! - `GET /ws-scan` upgrade and stream a scan of every stored target

mod handlers;
pub mod ws;

use crate::config::AppSettings;
use crate::pipeline::ExpansionPipeline;
use crate::storage::TargetStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub use handlers::TargetBatch;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub store: Arc<dyn TargetStore>,
    pub pipeline: ExpansionPipeline,
}

impl AppState {
    pub fn new(
        settings: AppSettings,
        store: Arc<dyn TargetStore>,
        pipeline: ExpansionPipeline,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
            pipeline,
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/parse", post(handlers::parse_targets))
        .route("/ws-scan", get(handlers::ws_scan))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve(app_state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
