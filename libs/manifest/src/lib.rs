//! # fleetform-manifest
//!
//! Turns a stack manifest into one template and hands it to a backend.
//!
//! ```toml
//! [context]
//! region = "us-east-1"
//! account_id = "123456789012"
//! stack_name = "workers"
//!
//! [fleet]
//! shapes = ["m5.large", "m5.xlarge"]
//! on_demand_percentage = 20
//!
//! [fleet.network]
//! vpc_id = "vpc-0abc"
//! subnet_ids = ["subnet-a", "subnet-b"]
//!
//! [deploy]
//! source_path = "scripts"
//! schedule = "rate(1 day)"
//! ```
//!
//! Context values can be overridden with `FLEETFORM_REGION`,
//! `FLEETFORM_ACCOUNT_ID` and `FLEETFORM_STACK_NAME`.

mod config;
mod manifest;
mod synth;

pub use config::{ContextOverrides, ContextSection, ACCOUNT_ID_ENV, REGION_ENV, STACK_NAME_ENV};
pub use manifest::{manifest_hash_from_path, manifest_hash_from_toml_str, Manifest};
pub use synth::{synthesize, synthesize_stack, SynthesizedStack};
