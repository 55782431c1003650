//! Wire types for the HTTP API: response envelopes and request bodies.
//!
//! Request bodies arrive as untyped JSON and are checked field by field
//! here, so that network input is held to the same [`ValidationError`]
//! contract as the domain functions.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    normalize_title, ErrorCode, Priority, TaskFilter, TaskPatch, TaskStatus, ValidationError,
};
use crate::service::ServiceError;

/// Successful response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
}

/// Error details inside a failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub code: ErrorCode,
}

/// Failure response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: u16,
    pub error: ApiErrorBody,
}

/// A failed request, rendered as an [`ApiError`] envelope.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiFailure {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Logs the cause and hides it from the client.
    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{:#}", err), "request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            "Internal server error",
        )
    }
}

impl From<ValidationError> for ApiFailure {
    fn from(err: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.code(), err.to_string())
    }
}

impl From<ServiceError> for ApiFailure {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, ErrorCode::TaskNotFound, err.to_string())
            }
            ServiceError::Storage(e) => Self::internal(e),
        }
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedBody(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for ApiFailure {
    fn from(rejection: QueryRejection) -> Self {
        ValidationError::MalformedQuery(rejection.body_text()).into()
    }
}

/// Path segments that cannot be decoded never name a task.
impl From<PathRejection> for ApiFailure {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ApiError {
            status_code: self.status.as_u16(),
            error: ApiErrorBody {
                message: self.message,
                code: self.code,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Looks up a field by its canonical or localized name. `null` counts as absent.
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|value| !value.is_null())
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object()
        .ok_or_else(|| ValidationError::MalformedBody("expected a JSON object".to_string()))
}

fn as_str<'a>(value: &'a Value, name: &'static str) -> Result<&'a str, ValidationError> {
    value.as_str().ok_or(ValidationError::WrongType {
        field: name,
        expected: "string",
    })
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub title: String,
    pub priority: Priority,
}

impl CreateTaskRequest {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let obj = as_object(body)?;

        let title = field(obj, &["title", "titulo"]).ok_or(ValidationError::MissingField("title"))?;
        let title = normalize_title(as_str(title, "title")?)?;

        let priority = field(obj, &["priority", "prioridad"])
            .ok_or(ValidationError::MissingField("priority"))?;
        let priority = as_str(priority, "priority")?.parse::<Priority>()?;

        Ok(Self {
            title: title.to_string(),
            priority,
        })
    }
}

/// Body of `PATCH /api/tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTaskRequest(pub TaskPatch);

impl UpdateTaskRequest {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let obj = as_object(body)?;
        let mut patch = TaskPatch::default();

        if let Some(title) = field(obj, &["title", "titulo"]) {
            patch.title = Some(normalize_title(as_str(title, "title")?)?.to_string());
        }

        if let Some(priority) = field(obj, &["priority", "prioridad"]) {
            patch.priority = Some(as_str(priority, "priority")?.parse::<Priority>()?);
        }

        if let Some(status) = field(obj, &["status", "estado"]) {
            patch.status = Some(as_str(status, "status")?.parse::<TaskStatus>()?);
        }

        Ok(Self(patch))
    }
}

/// Body of `POST /api/tasks/validate-title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateTitleRequest {
    pub title: String,
}

impl ValidateTitleRequest {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let obj = as_object(body)?;
        let title = field(obj, &["title", "titulo"]).ok_or(ValidationError::MissingField("title"))?;
        Ok(Self {
            title: as_str(title, "title")?.to_string(),
        })
    }
}

/// Query string of `GET /api/tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub filter: Option<String>,
}

impl ListParams {
    /// The requested filter; a missing or blank value means `all`
    pub fn filter(&self) -> Result<TaskFilter, ValidationError> {
        match self.filter.as_deref().map(str::trim) {
            None | Some("") => Ok(TaskFilter::All),
            Some(raw) => raw.parse(),
        }
    }
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub storage: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_accepts_canonical_and_localized_fields() {
        let req = CreateTaskRequest::from_json(&json!({"title": " Plan ", "priority": "high"}))
            .unwrap();
        assert_eq!(req.title, "Plan");
        assert_eq!(req.priority, Priority::High);

        let req =
            CreateTaskRequest::from_json(&json!({"titulo": "Plan", "prioridad": "baja"})).unwrap();
        assert_eq!(req.priority, Priority::Low);
    }

    #[test]
    fn create_request_rejects_bad_input() {
        assert_eq!(
            CreateTaskRequest::from_json(&json!({"priority": "high"})),
            Err(ValidationError::MissingField("title"))
        );
        assert_eq!(
            CreateTaskRequest::from_json(&json!({"title": "x"})),
            Err(ValidationError::MissingField("priority"))
        );
        assert_eq!(
            CreateTaskRequest::from_json(&json!({"title": 5, "priority": "high"})),
            Err(ValidationError::WrongType {
                field: "title",
                expected: "string"
            })
        );
        assert_eq!(
            CreateTaskRequest::from_json(&json!({"title": "  ", "priority": "high"})),
            Err(ValidationError::EmptyTitle)
        );
        assert_eq!(
            CreateTaskRequest::from_json(&json!({"title": "x", "priority": "urgent"})),
            Err(ValidationError::InvalidPriority("urgent".into()))
        );
        assert!(matches!(
            CreateTaskRequest::from_json(&json!(["title"])),
            Err(ValidationError::MalformedBody(_))
        ));
    }

    #[test]
    fn update_request_collects_present_fields() {
        let UpdateTaskRequest(patch) =
            UpdateTaskRequest::from_json(&json!({"status": "completed", "title": null})).unwrap();
        assert_eq!(patch.status, Some(TaskStatus::Completed));
        assert_eq!(patch.title, None);
        assert_eq!(patch.priority, None);

        let UpdateTaskRequest(patch) = UpdateTaskRequest::from_json(&json!({})).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn update_request_rejects_bad_enum_values() {
        assert_eq!(
            UpdateTaskRequest::from_json(&json!({"status": "archived"})),
            Err(ValidationError::InvalidStatus("archived".into()))
        );
        assert_eq!(
            UpdateTaskRequest::from_json(&json!({"priority": 1})),
            Err(ValidationError::WrongType {
                field: "priority",
                expected: "string"
            })
        );
    }

    #[test]
    fn blank_filter_means_all() {
        let params = |filter: Option<&str>| ListParams {
            filter: filter.map(str::to_string),
        };

        assert_eq!(params(None).filter(), Ok(TaskFilter::All));
        assert_eq!(params(Some("")).filter(), Ok(TaskFilter::All));
        assert_eq!(params(Some("  ")).filter(), Ok(TaskFilter::All));
        assert_eq!(params(Some("pending")).filter(), Ok(TaskFilter::Pending));
        assert_eq!(
            params(Some("bogus")).filter(),
            Err(ValidationError::InvalidFilter("bogus".into()))
        );
    }

    #[test]
    fn failure_mapping() {
        let failure: ApiFailure = ValidationError::InvalidFilter("x".into()).into();
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert_eq!(failure.code, ErrorCode::InvalidFilter);

        let failure: ApiFailure = ServiceError::NotFound("abc".parse().unwrap()).into();
        assert_eq!(failure.status, StatusCode::NOT_FOUND);
        assert_eq!(failure.code, ErrorCode::TaskNotFound);

        let failure: ApiFailure = ServiceError::Storage(anyhow::anyhow!("disk full")).into();
        assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.message, "Internal server error");
    }
}
