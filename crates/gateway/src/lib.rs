//! HTTP surface of the toolbridge service.
//!
//! | Method | Path              | Body                     |
//! |--------|-------------------|--------------------------|
//! | GET    | `/api/tools`      |                          |
//! | POST   | `/api/tools/call` | `{ name, arguments }`    |
//! | POST   | `/api/chat`       | `{ message, history? }`  |
//! | GET    | `/api/health`     |                          |

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use runtime::{Backend, DEFAULT_SYSTEM_PROMPT, ToolHostClient};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use error::ApiError;
pub use handlers::{ChatRequest, HealthResponse, ToolCallRequest, ToolsResponse};

/// Shared state handed to every handler.
pub struct AppState<B, H> {
    backend: Arc<B>,
    host: Arc<H>,
    system_prompt: Arc<str>,
}

impl<B, H> Clone for AppState<B, H> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            host: Arc::clone(&self.host),
            system_prompt: Arc::clone(&self.system_prompt),
        }
    }
}

impl<B: Backend, H: ToolHostClient> AppState<B, H> {
    pub fn new(backend: B, host: H) -> Self {
        Self {
            backend: Arc::new(backend),
            host: Arc::new(host),
            system_prompt: Arc::from(DEFAULT_SYSTEM_PROMPT),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Arc::from(system_prompt.into());
        self
    }
}

/// Build the router with all API routes.
pub fn router<B, H>(state: AppState<B, H>) -> Router
where
    B: Backend + 'static,
    H: ToolHostClient + 'static,
{
    Router::new()
        .route("/api/tools", get(handlers::list_tools::<B, H>))
        .route("/api/tools/call", post(handlers::call_tool::<B, H>))
        .route("/api/chat", post(handlers::chat::<B, H>))
        .route("/api/health", get(handlers::health::<B, H>))
        .with_state(state)
}

/// Serve the API on `addr` until Ctrl-C.
pub async fn serve<B, H>(addr: SocketAddr, state: AppState<B, H>) -> std::io::Result<()>
where
    B: Backend + 'static,
    H: ToolHostClient + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "bridge listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
