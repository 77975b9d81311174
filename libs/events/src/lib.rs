//! # fleetform-events
//!
//! Event shapes and matching rules for the deployment pipeline.
//!
//! ## Design Principles
//!
//! - Bus events mirror the envelope the event bus delivers, so a pattern that
//!   matches here matches there
//! - Patterns are data: they are serialized into the rule unchanged and
//!   evaluated locally with the same semantics
//! - Schedules are validated at construction, never at trigger time
//!
//! ## Event Flow
//!
//! 1. An object-storage API call is recorded by the audit trail
//! 2. The bus wraps it in a [`BusEvent`] with `detail-type` set to
//!    [`DETAIL_TYPE_API_CALL`]
//! 3. Rules evaluate their [`EventPattern`] against the event
//! 4. Matching rules dispatch to their targets
//!
//! Independently, a [`ScheduleExpression`] fires the same targets on a cadence.

mod envelope;
mod error;
mod pattern;
mod schedule;
mod types;

pub use envelope::*;
pub use error::EventError;
pub use pattern::EventPattern;
pub use schedule::{CronExpression, RateUnit, ScheduleExpression};
pub use types::*;
