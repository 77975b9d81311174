//! Manifest parsing and hashing helpers.
//!
//! A manifest is a TOML file with a `[context]` table, a `[fleet]` table
//! (optionally `[fleet.scaling]`) and an optional `[deploy]` table. The
//! content hash is computed from a canonicalized representation of the TOML,
//! so formatting and key order do not change it.

use std::path::Path;

use anyhow::{Context, Result};
use fleetform_deploy::DeployPipelineConfig;
use fleetform_fleet::FleetSpec;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ContextSection;

/// A parsed stack manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub context: ContextSection,

    pub fleet: FleetSpec,

    #[serde(default)]
    pub deploy: Option<DeployPipelineConfig>,
}

impl Manifest {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid manifest TOML")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to load manifest: {}", path.display()))
    }
}

pub fn manifest_hash_from_toml_str(contents: &str) -> Result<String> {
    let value: toml::Value = toml::from_str(contents).context("invalid manifest TOML")?;
    if !value.is_table() {
        anyhow::bail!("manifest must be a TOML table (key/value pairs at top-level)");
    }

    let json_value = serde_json::to_value(&value).context("failed to canonicalize manifest")?;
    let canonical_json =
        serde_json::to_vec(&json_value).context("failed to serialize manifest for hashing")?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical_json);
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

pub fn manifest_hash_from_path(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    manifest_hash_from_toml_str(&contents)
        .with_context(|| format!("failed to compute manifest hash: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetform_fleet::ImageSpec;

    const MANIFEST: &str = r#"
[context]
region = "us-east-1"
account_id = "123456789012"
stack_name = "workers"

[fleet]
shapes = ["m5.large", "m5.xlarge"]
on_demand_percentage = 20
min_capacity = 2
image = { id = "ami-0abc" }

[fleet.network]
vpc_id = "vpc-1"
subnet_ids = ["subnet-a", "subnet-b"]

[fleet.tags]
team = "platform"

[fleet.scaling]
max_capacity = 6
target_percentage = 70.0

[deploy]
source_path = "scripts"
schedule = "rate(1 day)"
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();

        assert_eq!(manifest.context.stack_name.as_deref(), Some("workers"));
        assert_eq!(manifest.fleet.shapes.len(), 2);
        assert_eq!(manifest.fleet.on_demand_percentage, Some(20));
        assert_eq!(manifest.fleet.image, ImageSpec::Id("ami-0abc".into()));
        assert_eq!(manifest.fleet.tags.get("team").map(String::as_str), Some("platform"));

        let scaling = manifest.fleet.scaling.unwrap();
        assert_eq!(scaling.max_capacity, Some(6));
        assert_eq!(scaling.target_percentage, Some(70.0));

        let deploy = manifest.deploy.unwrap();
        assert_eq!(deploy.key_prefix(), "scripts");
        assert_eq!(deploy.schedule.unwrap().to_string(), "rate(1 day)");
        assert!(deploy.targets.is_empty());
    }

    #[test]
    fn parse_rejects_bad_values() {
        let bad_shape = MANIFEST.replace("\"m5.xlarge\"", "\"\"");
        assert!(Manifest::parse(&bad_shape).is_err());

        let bad_schedule = MANIFEST.replace("rate(1 day)", "rate(1 days)");
        assert!(Manifest::parse(&bad_schedule).is_err());

        let unknown = format!("{MANIFEST}\n[extras]\nkey = 1\n");
        assert!(Manifest::parse(&unknown).is_err());
    }

    #[test]
    fn manifest_hash_is_deterministic_across_formatting() {
        let a = r#"
[context]
stack_name = "workers"

[fleet]
shapes = ["m5.large"]

[fleet.network]
vpc_id = "vpc-1"
subnet_ids = ["subnet-a"]
"#;

        let b = r#"
[fleet.network]
subnet_ids=["subnet-a"]
vpc_id="vpc-1"
[fleet]
shapes=["m5.large"]
[context]
stack_name="workers"
"#;

        let ha = manifest_hash_from_toml_str(a).unwrap();
        let hb = manifest_hash_from_toml_str(b).unwrap();
        assert_eq!(ha, hb);
        assert!(ha.starts_with("sha256:"));
        assert_eq!(ha.len(), "sha256:".len() + 64);

        let hc = manifest_hash_from_toml_str(&a.replace("m5.large", "m5.xlarge")).unwrap();
        assert_ne!(ha, hc);
    }
}
