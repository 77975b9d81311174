//! Error types for fleet planning.

use fleetform_id::IdError;
use fleetform_template::TemplateError;
use thiserror::Error;

/// Configuration errors raised before any plan is emitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FleetError {
    /// On-demand-only mode was requested with more than one shape.
    #[error("multiple shapes with on-demand capacity: {count} given, exactly one allowed")]
    MultipleShapesOnDemand { count: usize },

    /// Mixed mode was requested with fewer than two shapes.
    #[error("single shape with spot capacity: {count} given, at least two required")]
    SingleShapeWithSpot { count: usize },

    /// On-demand-only mode was requested with no shape at all.
    #[error("no instance shape given")]
    NoInstanceShape,

    #[error("invalid instance shape '{shape}': {reason}")]
    InvalidShape { shape: String, reason: String },

    /// Capacity bounds are inconsistent.
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),

    #[error("invalid cluster name: {0}")]
    InvalidClusterName(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Scaling plan bounds or target are out of range.
    #[error("invalid scaling plan: {0}")]
    InvalidScaling(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Id(#[from] IdError),
}

impl FleetError {
    /// Whether the error comes from instance shape selection.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            FleetError::MultipleShapesOnDemand { .. }
                | FleetError::SingleShapeWithSpot { .. }
                | FleetError::NoInstanceShape
        )
    }
}
