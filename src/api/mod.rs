//! HTTP facade: a server-rendered form for people, JSON for programs.

mod handlers;
pub mod page;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::engine::Engine;

pub use handlers::{ApiError, ApiSolveRequest, SolveResponse};

/// Static facts about the running service, echoed in responses.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub model: String,
    pub verifier_model: String,
    pub max_attempts: usize,
}

impl From<&Config> for ServiceInfo {
    fn from(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            verifier_model: config.verifier_model.clone(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Shared application state. Holds no per-request data.
pub struct AppState {
    pub engine: Arc<dyn Engine>,
    pub info: ServiceInfo,
}

impl AppState {
    pub fn new(engine: Arc<dyn Engine>, info: ServiceInfo) -> Self {
        Self { engine, info }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/solve", post(handlers::solve_form))
        .route("/api/solve", post(handlers::solve_json))
        .route("/api/task-types", get(handlers::task_types))
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already-bound listener until Ctrl+C.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
