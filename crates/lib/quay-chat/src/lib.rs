//! HTTP chat server for quay.
//!
//! Serves `POST /api/chat`, which runs one two-round tool-dispatch turn, and
//! `GET /api/health`. Anything else falls through to a static directory that
//! holds the browser client.

mod error;
mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use quay_core::conversation::Orchestrator;
use quay_core::llm::ChatModel;
use quay_core::store::TerminalStore;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use routes::{ChatRequest, ChatResponse, HealthResponse};

/// Configuration for the chat HTTP server.
#[derive(Debug, Clone)]
pub struct ChatServerConfig {
    pub addr: SocketAddr,
    pub public_dir: PathBuf,
    pub max_body_bytes: usize,
}

impl ChatServerConfig {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            public_dir: PathBuf::from("public"),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }

    #[must_use]
    pub fn with_public_dir(mut self, public_dir: impl Into<PathBuf>) -> Self {
        self.public_dir = public_dir.into();
        self
    }

    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

impl Default for ChatServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 3000)))
    }
}

/// State shared by every request. Holds no per-conversation data.
pub struct AppState<M, S> {
    orchestrator: Arc<Orchestrator<M, S>>,
}

impl<M, S> AppState<M, S> {
    #[must_use]
    pub const fn new(orchestrator: Arc<Orchestrator<M, S>>) -> Self {
        Self { orchestrator }
    }
}

impl<M, S> Clone for AppState<M, S> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
        }
    }
}

/// HTTP chat server wrapper.
pub struct ChatServer<M, S> {
    config: ChatServerConfig,
    state: AppState<M, S>,
}

impl<M, S> ChatServer<M, S>
where
    M: ChatModel + 'static,
    S: TerminalStore + 'static,
{
    #[must_use]
    pub const fn new(orchestrator: Arc<Orchestrator<M, S>>, config: ChatServerConfig) -> Self {
        Self {
            config,
            state: AppState::new(orchestrator),
        }
    }

    /// Runs the HTTP server until `shutdown` resolves, then drains in-flight requests.
    ///
    /// # Errors
    /// Returns any listener or server error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.addr;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let provider = self.state.orchestrator.model().provider_name().to_string();
        let app = build_router(self.state, &self.config);

        info!(%addr, %provider, public_dir = %self.config.public_dir.display(), "chat server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("chat server stopped");
        Ok(())
    }
}

/// Builds the chat router with static fallback, CORS and request tracing.
pub fn build_router<M, S>(state: AppState<M, S>, config: &ChatServerConfig) -> Router
where
    M: ChatModel + 'static,
    S: TerminalStore + 'static,
{
    Router::new()
        .route("/api/chat", post(routes::chat::<M, S>))
        .route("/api/health", get(routes::health::<M, S>))
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
