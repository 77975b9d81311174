//! # fleetform-deploy
//!
//! Ships files to fleet members whenever they change.
//!
//! Files are uploaded under a key prefix in a deployment bucket. Each upload
//! becomes an audit-trail event; a rule matching `PutObject` on that bucket
//! sends a remote-command document to the configured targets, and the
//! document syncs the prefix locally and runs everything under `bin/`.
//!
//! - [`DeploymentDocumentBuilder`] builds the document
//! - [`DeployEventPipeline`] declares bucket, trail, rule, roles and the
//!   optional scheduled association, and evaluates events locally with
//!   [`DeployEventPipeline::route`]

mod config;
mod document;
mod error;
mod pipeline;
mod target;

pub use config::DeployPipelineConfig;
pub use document::{normalize_prefix, DeploymentDocumentBuilder, RemoteCommandDocument};
pub use error::DeployError;
pub use pipeline::{
    put_object_pattern, CommandDispatch, DeployEventPipeline, PipelineHandles, Trigger,
    DEFAULT_SCOPE, INSTANCE_MANAGED_POLICY,
};
pub use target::{validate_targets, CommandTarget, MAX_TARGETS};
