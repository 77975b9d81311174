//! Error types for the deployment pipeline.

use fleetform_events::EventError;
use fleetform_id::IdError;
use fleetform_template::TemplateError;
use thiserror::Error;

/// Errors raised while building deployment artifacts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// The pipeline configuration is unusable.
    #[error("invalid deploy configuration: {0}")]
    InvalidConfig(String),

    /// A bucket name the pipeline would use is not a valid bucket name.
    #[error("invalid bucket name '{name}': {reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Event(#[from] EventError),
}
