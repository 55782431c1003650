//! HTTP API for taskboard.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/tasks?filter=all|pending|completed` - List tasks
//! - `POST /api/tasks` - Create a task
//! - `GET /api/tasks/stats` - Task counts by status
//! - `POST /api/tasks/validate-title` - Check a title without creating anything
//! - `GET /api/tasks/{id}` - Get a task
//! - `PATCH /api/tasks/{id}` - Update title, priority or status
//! - `DELETE /api/tasks/{id}` - Delete a task
//! - `POST /api/tasks/{id}/toggle` - Flip pending/completed
//!
//! Successful responses are wrapped as `{"statusCode": .., "data": ..}`,
//! failures as `{"statusCode": .., "error": {"message": .., "code": ..}}`.

mod handlers;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::TaskService;
use crate::storage::{self, Config, ServerConfig};

pub use types::{ApiError, ApiErrorBody, ApiFailure, ApiResponse};

/// Shared application state.
pub struct AppState {
    pub service: Arc<TaskService>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(service: Arc<TaskService>, config: ServerConfig) -> Self {
        Self { service, config }
    }
}

/// Builds the CORS policy for the configured origin (`*` allows any).
fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origin: HeaderValue = origin
        .trim()
        .parse()
        .with_context(|| format!("Invalid CORS origin: {}", origin))?;
    Ok(layer.allow_origin(origin))
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.cors_origin)?;

    let api = Router::new()
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route("/tasks/stats", get(handlers::task_stats))
        .route("/tasks/validate-title", post(handlers::validate_title))
        .route(
            "/tasks/{id}",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/tasks/{id}/toggle", post(handlers::toggle_task));

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = storage::open_store(&config.storage)?;
    if !store.is_persistent() {
        tracing::warn!("Using in-memory storage; tasks will be lost on shutdown");
    }

    let service = Arc::new(TaskService::new(store));
    let state = Arc::new(AppState::new(service, config.server.clone()));
    let app = router(Arc::clone(&state))?;

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        storage = %state.service.store().describe(),
        cors_origin = %config.server.cors_origin,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_wildcard_and_origins() {
        assert!(cors_layer("*").is_ok());
        assert!(cors_layer("http://localhost:3000").is_ok());
        assert!(cors_layer("bad\norigin").is_err());
    }
}
