//! # fleetform-fleet
//!
//! Compiles a worker fleet request into launch, scaling and update resources.
//!
//! ## Pipeline
//!
//! 1. [`select_capacity`] checks the requested shapes against the on-demand
//!    percentage and yields a [`CapacityDistribution`]
//! 2. [`BootScriptComposer`] builds the member boot script, ending in a signal
//!    to the scaling group that owns the creation policy
//! 3. [`LaunchPlanBuilder`] assembles the launch template
//! 4. [`UpdatePolicy`] derives rolling update and creation policies from the
//!    minimum capacity
//! 5. [`FleetPlanner`] runs the above and declares everything in one pass
//!
//! Optionally, [`ScalingPlanBuilder`] adds target-tracking scaling.
//!
//! Every error is a configuration error raised before the template is
//! written; runtime failures (members that never signal, tagging failures)
//! are left to the orchestrator's timeouts.

mod boot;
mod error;
mod launch;
mod planner;
mod policy;
mod scaling;
mod selector;
mod shape;
mod spec;

pub use boot::{BootScript, BootScriptComposer, SHEBANG};
pub use error::FleetError;
pub use launch::{LaunchPlan, LaunchPlanBuilder, CLUSTER_NAME_TAG};
pub use planner::{FleetHandles, FleetPlan, FleetPlanner, Unvalidated, Validated, DEFAULT_SCOPE};
pub use policy::{UpdatePolicy, BOOT_SIGNAL_TIMEOUT, SUSPENDED_PROCESSES};
pub use scaling::{ScalingPlanBuilder, ScalingSpec, TagFilter};
pub use selector::{select_capacity, CapacityDistribution, ON_DEMAND_ONLY_PERCENTAGE};
pub use shape::InstanceShape;
pub use spec::{FleetSpec, ImageSpec, NetworkSpec, ECS_OPTIMIZED_IMAGE_PARAMETER};
