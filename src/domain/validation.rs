//! Validation rules and error taxonomy for the task domain
//!
//! Every rule lives here once. Task creation, partial updates and the HTTP
//! boundary all report failures through [`ValidationError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum title length in characters, after trimming
pub const MAX_TITLE_LEN: usize = 100;

/// Machine-readable error codes shared with API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    TaskNotFound,
    InvalidFilter,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::TaskNotFound => "TASK_NOT_FOUND",
            ErrorCode::InvalidFilter => "INVALID_FILTER",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Title must be at most {max} characters (got {len})", max = MAX_TITLE_LEN)]
    TitleTooLong { len: usize },

    #[error("Invalid priority '{0}': expected one of high, medium, low")]
    InvalidPriority(String),

    #[error("Invalid status '{0}': expected one of pending, completed")]
    InvalidStatus(String),

    #[error("Invalid filter '{0}': expected one of all, pending, completed")]
    InvalidFilter(String),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Malformed query string: {0}")]
    MalformedQuery(String),
}

impl ValidationError {
    /// Returns the error code reported to API clients
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationError::InvalidFilter(_) => ErrorCode::InvalidFilter,
            _ => ErrorCode::ValidationError,
        }
    }
}

/// Outcome of a standalone validation check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

impl From<Result<&str, ValidationError>> for ValidationResult {
    fn from(result: Result<&str, ValidationError>) -> Self {
        match result {
            Ok(_) => Self::valid(),
            Err(e) => Self::invalid(e.to_string()),
        }
    }
}

/// Checks a title and returns its trimmed form
pub fn normalize_title(title: &str) -> Result<&str, ValidationError> {
    let trimmed = title.trim();
    let len = trimmed.chars().count();

    if len == 0 {
        return Err(ValidationError::EmptyTitle);
    }
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong { len });
    }

    Ok(trimmed)
}

/// Validates a task title without constructing anything
pub fn validate_task_title(title: &str) -> ValidationResult {
    normalize_title(title).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_title() {
        assert_eq!(validate_task_title("Buy milk"), ValidationResult::valid());
    }

    #[test]
    fn rejects_empty_and_blank_titles() {
        assert_eq!(normalize_title(""), Err(ValidationError::EmptyTitle));
        assert_eq!(normalize_title("   \t\n"), Err(ValidationError::EmptyTitle));

        let result = validate_task_title("   ");
        assert!(!result.is_valid);
        assert_eq!(result.error.as_deref(), Some("Title cannot be empty"));
    }

    #[test]
    fn length_boundary() {
        let exact = "x".repeat(100);
        assert_eq!(normalize_title(&exact), Ok(exact.as_str()));

        let over = "x".repeat(101);
        assert_eq!(
            normalize_title(&over),
            Err(ValidationError::TitleTooLong { len: 101 })
        );
    }

    #[test]
    fn length_is_measured_after_trimming() {
        let padded = format!("  {}  ", "x".repeat(100));
        assert_eq!(normalize_title(&padded).unwrap().len(), 100);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 100 two-byte characters
        let accented = "é".repeat(100);
        assert!(validate_task_title(&accented).is_valid);
        assert!(!validate_task_title(&"é".repeat(101)).is_valid);
    }

    #[test]
    fn error_codes() {
        assert_eq!(ValidationError::EmptyTitle.code(), ErrorCode::ValidationError);
        assert_eq!(
            ValidationError::InvalidPriority("x".into()).code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            ValidationError::InvalidFilter("bogus".into()).code(),
            ErrorCode::InvalidFilter
        );
    }

    #[test]
    fn error_code_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::TaskNotFound).unwrap();
        assert_eq!(json, "\"TASK_NOT_FOUND\"");
        assert_eq!(ErrorCode::InternalError.to_string(), "INTERNAL_ERROR");
    }

    #[test]
    fn validation_result_json_shape() {
        let json = serde_json::to_value(ValidationResult::valid()).unwrap();
        assert_eq!(json, serde_json::json!({ "isValid": true }));

        let json = serde_json::to_value(ValidationResult::invalid("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "isValid": false, "error": "nope" }));
    }
}
