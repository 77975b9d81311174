//! Error types for template construction.

use fleetform_id::{IdError, LogicalId};
use thiserror::Error;

/// Errors raised while building a template or its context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Two resources were declared under the same logical id.
    #[error("duplicate logical id: {0}")]
    DuplicateLogicalId(LogicalId),

    /// A resource body was declared through a handle of another type.
    #[error("resource {id} declared as {declared} through a {expected} handle")]
    TypeMismatch {
        id: LogicalId,
        expected: &'static str,
        declared: String,
    },

    /// A deployment context field failed validation.
    #[error("invalid deployment context {field}: {reason}")]
    InvalidContext { field: &'static str, reason: String },

    /// A value destined for a shell script contains unsafe characters.
    #[error("{field} is not safe for shell interpolation: {reason}")]
    UnsafeShellInput { field: String, reason: String },

    /// A logical id could not be built.
    #[error(transparent)]
    Id(#[from] IdError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TemplateError {
    fn from(err: serde_json::Error) -> Self {
        TemplateError::Serialization(err.to_string())
    }
}
