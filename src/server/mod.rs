pub mod handlers;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{store::ClipStore, ClipSyncError, Result, MAX_BODY_SIZE};
use handlers::{fetch_handler, health_handler, not_found_handler, submit_handler};

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<ClipStore>,
}

/// Builds the HTTP API around a store.
pub fn router(store: Arc<ClipStore>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/clip", get(fetch_handler).post(submit_handler))
        .route("/clip/latest", get(fetch_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ServerState { store })
}

pub struct ClipServer {
    store: Arc<ClipStore>,
    host: String,
    port: u16,
}

impl ClipServer {
    pub fn new(store: Arc<ClipStore>, host: String, port: u16) -> Self {
        Self { store, host, port }
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = format!("{}:{}", self.host, self.port);
        TcpListener::bind(&addr)
            .await
            .map_err(|e| ClipSyncError::Server(format!("Failed to bind to {addr}: {e}")))
    }

    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ClipSyncError::Server(e.to_string()))?;
        info!("Clipboard server listening on http://{}", addr);

        axum::serve(listener, router(self.store))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ClipSyncError::Server(e.to_string()))?;

        info!("Clipboard server stopped");
        Ok(())
    }
}
