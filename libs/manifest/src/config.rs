use anyhow::{bail, Result};
use fleetform_template::DeploymentContext;
use serde::{Deserialize, Serialize};

pub const REGION_ENV: &str = "FLEETFORM_REGION";
pub const ACCOUNT_ID_ENV: &str = "FLEETFORM_ACCOUNT_ID";
pub const STACK_NAME_ENV: &str = "FLEETFORM_STACK_NAME";

/// The `[context]` table of a manifest. Every value may instead come from
/// the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSection {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub stack_name: Option<String>,
}

/// Context values taken from the environment. Set values win over the
/// manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextOverrides {
    pub region: Option<String>,
    pub account_id: Option<String>,
    pub stack_name: Option<String>,
}

impl ContextOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            region: read(REGION_ENV),
            account_id: read(ACCOUNT_ID_ENV),
            stack_name: read(STACK_NAME_ENV),
        }
    }
}

impl ContextSection {
    /// Merge with `overrides` and validate.
    pub fn resolve(&self, overrides: &ContextOverrides) -> Result<DeploymentContext> {
        let region = pick(&overrides.region, &self.region, "region", REGION_ENV)?;
        let account_id = pick(&overrides.account_id, &self.account_id, "account_id", ACCOUNT_ID_ENV)?;
        let stack_name = pick(&overrides.stack_name, &self.stack_name, "stack_name", STACK_NAME_ENV)?;

        Ok(DeploymentContext::new(region, account_id, stack_name)?)
    }
}

fn pick(
    overridden: &Option<String>,
    declared: &Option<String>,
    field: &str,
    env: &str,
) -> Result<String> {
    match overridden.as_ref().or(declared.as_ref()) {
        Some(value) => Ok(value.clone()),
        None => bail!("{field} is not set: add it to [context] or set {env}"),
    }
}
