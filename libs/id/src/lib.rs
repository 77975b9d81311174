//! # fleetform-id
//!
//! Logical resource ids and typed resource handles for fleetform templates.
//!
//! ## Design Principles
//!
//! - Logical ids are validated once, at construction; every later use is infallible
//! - Builders return typed handles; consumers take handles, never name strings
//! - A handle knows the resource type it points at, so a launch template handle
//!   cannot be passed where a scaling group is expected
//!
//! ## ID Format
//!
//! Logical ids follow the template engine's rules: ASCII alphanumeric,
//! 1 to 255 characters. Scoped ids are built by concatenation:
//!
//! - `Fleet` + `AutoScalingGroup` → `FleetAutoScalingGroup`
//! - `Deploy` + `Commands` → `DeployCommands`

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;
