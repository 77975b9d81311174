//! # fleetform-template
//!
//! The resource graph every fleetform builder writes into.
//!
//! ## Design Principles
//!
//! - A [`Template`] is built in one pass; resources are declared, never patched
//! - Every declaration goes through a typed handle from `fleetform-id`
//! - Region, account and stack name come from an explicit [`DeploymentContext`]
//! - Serialization is deterministic, so identical inputs produce identical bytes
//!   and an identical [`TemplateDigest`]
//!
//! ## Backend
//!
//! Resource creation is delegated to an [`InfrastructureBackend`]. The bundled
//! [`InMemoryBackend`] records submitted templates and hands back stable
//! physical ids, which is enough for tests and dry runs.

mod backend;
mod context;
mod digest;
mod error;
pub mod intrinsic;
mod policy;
mod resource;
pub mod shell;
mod tag;
mod template;

pub use backend::{BackendError, InMemoryBackend, InfrastructureBackend, StackReceipt};
pub use context::DeploymentContext;
pub use digest::TemplateDigest;
pub use error::TemplateError;
pub use policy::{Effect, PolicyDocument, PolicyStatement};
pub use resource::Resource;
pub use tag::Tag;
pub use template::{Output, Template, TEMPLATE_FORMAT_VERSION};
