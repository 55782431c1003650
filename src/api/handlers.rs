//! HTTP route handlers.
//!
//! Handlers validate untyped input, then run the blocking service call on
//! the blocking thread pool.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::Value;

use super::types::{
    ApiFailure, ApiResponse, CreateTaskRequest, HealthStatus, ListParams, UpdateTaskRequest,
    ValidateTitleRequest,
};
use super::AppState;
use crate::domain::{validate_task_title, ErrorCode, Task, TaskId, TaskStats, ValidationResult};
use crate::service::{self, TaskService};

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiFailure>;

fn respond<T>(status: StatusCode, data: T) -> ApiResult<T> {
    Ok((
        status,
        Json(ApiResponse {
            status_code: status.as_u16(),
            data,
        }),
    ))
}

/// Runs a service call off the async runtime.
async fn run<T, F>(state: &AppState, call: F) -> Result<T, ApiFailure>
where
    F: FnOnce(&TaskService) -> service::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| ApiFailure::internal(e.into()))?
        .map_err(ApiFailure::from)
}

/// Path IDs that cannot name a task are reported as missing.
fn parse_id(path: Result<Path<String>, PathRejection>) -> Result<TaskId, ApiFailure> {
    let Path(raw) = path?;
    raw.parse::<TaskId>().map_err(|_| {
        ApiFailure::new(
            StatusCode::NOT_FOUND,
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", raw.trim()),
        )
    })
}

/// Health check.
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthStatus> {
    respond(
        StatusCode::OK,
        HealthStatus {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: state.service.store().describe(),
        },
    )
}

/// `GET /api/tasks?filter=`
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Task>> {
    let Query(params) = params?;
    let filter = params.filter()?;

    let tasks = run(&state, move |service| service.list(filter)).await?;
    respond(StatusCode::OK, tasks)
}

/// `POST /api/tasks`
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Task> {
    let Json(body) = body?;
    let request = CreateTaskRequest::from_json(&body)?;

    let task = run(&state, move |service| {
        service.create(&request.title, request.priority)
    })
    .await?;

    tracing::info!(id = %task.id, "task created");
    respond(StatusCode::CREATED, task)
}

/// `GET /api/tasks/stats`
pub async fn task_stats(State(state): State<Arc<AppState>>) -> ApiResult<TaskStats> {
    let stats = run(&state, |service| service.stats()).await?;
    respond(StatusCode::OK, stats)
}

/// `POST /api/tasks/validate-title`
pub async fn validate_title(
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ValidationResult> {
    let Json(body) = body?;
    let request = ValidateTitleRequest::from_json(&body)?;
    respond(StatusCode::OK, validate_task_title(&request.title))
}

/// `GET /api/tasks/{id}`
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Task> {
    let id = parse_id(id)?;
    let task = run(&state, move |service| service.get(&id)).await?;
    respond(StatusCode::OK, task)
}

/// `PATCH /api/tasks/{id}`
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Task> {
    let id = parse_id(id)?;
    let Json(body) = body?;
    let UpdateTaskRequest(patch) = UpdateTaskRequest::from_json(&body)?;

    let task = run(&state, move |service| service.update(&id, &patch)).await?;
    respond(StatusCode::OK, task)
}

/// `POST /api/tasks/{id}/toggle`
pub async fn toggle_task(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Task> {
    let id = parse_id(id)?;
    let task = run(&state, move |service| service.toggle(&id)).await?;
    respond(StatusCode::OK, task)
}

/// `DELETE /api/tasks/{id}`
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Task> {
    let id = parse_id(id)?;
    let task = run(&state, move |service| service.remove(&id)).await?;

    tracing::info!(id = %task.id, "task deleted");
    respond(StatusCode::OK, task)
}
