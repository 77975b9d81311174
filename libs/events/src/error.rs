//! Error types for event handling.

use thiserror::Error;

/// Errors that can occur when building patterns, schedules, or events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The event pattern is malformed.
    #[error("invalid event pattern: {0}")]
    InvalidPattern(String),

    /// The schedule expression is malformed.
    #[error("invalid schedule expression '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl EventError {
    pub(crate) fn schedule(expression: &str, reason: impl Into<String>) -> Self {
        EventError::InvalidSchedule {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Serialization(err.to_string())
    }
}
