//! Task identifiers and the injectable sources of ids and time
//!
//! Ids are opaque strings. New ids are random UUID v4 values rendered in
//! their hyphenated form (e.g. `6f1c0c2e-3c1e-4b8e-9a57-2f4d1b0c9e11`), but
//! any non-empty string read back from storage is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Task ID cannot be empty")]
    Empty,

    #[error("Invalid task ID '{0}': must not contain whitespace")]
    Whitespace(String),
}

/// Opaque, globally unique task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh random ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(IdError::Whitespace(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

/// Source of new task identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> TaskId;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production ID source: random UUID v4
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> TaskId {
        TaskId::generate()
    }
}

/// Production clock: wall-clock UTC time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<TaskId> = (0..1000).map(|_| TaskId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn parse_accepts_opaque_strings() {
        let id: TaskId = "task-42".parse().unwrap();
        assert_eq!(id.as_str(), "task-42");
        assert_eq!(id.to_string(), "task-42");
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let id: TaskId = "  abc  ".parse().unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!("".parse::<TaskId>(), Err(IdError::Empty));
        assert_eq!("   ".parse::<TaskId>(), Err(IdError::Empty));
    }

    #[test]
    fn parse_rejects_inner_whitespace() {
        assert!(matches!(
            "a b".parse::<TaskId>(),
            Err(IdError::Whitespace(_))
        ));
    }

    #[test]
    fn serde_uses_plain_string() {
        let id: TaskId = "t-1".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"t-1\"");

        let parsed: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        assert!(serde_json::from_str::<TaskId>("\"\"").is_err());
    }

    #[test]
    fn uuid_generator_produces_uuids() {
        let id = UuidGenerator.next_id();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }
}
