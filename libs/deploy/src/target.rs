//! Remote command targets.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::DeployError;

/// Maximum number of targets a single command or association accepts.
pub const MAX_TARGETS: usize = 5;

/// A key/values filter selecting fleet members, e.g.
/// `tag:ClusterName = [workers-cluster]`. Passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandTarget {
    pub key: String,
    pub values: Vec<String>,
}

impl CommandTarget {
    pub fn new<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Target members carrying tag `name` with one of `values`.
    pub fn tag<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(format!("tag:{name}"), values)
    }

    /// `{"Key": .., "Values": [..]}`
    pub fn to_value(&self) -> Value {
        json!({ "Key": self.key, "Values": self.values })
    }
}

/// Check a target set before it is written into any resource.
pub fn validate_targets(targets: &[CommandTarget]) -> Result<(), DeployError> {
    if targets.is_empty() {
        return Err(DeployError::InvalidConfig(
            "at least one command target is required".into(),
        ));
    }
    if targets.len() > MAX_TARGETS {
        return Err(DeployError::InvalidConfig(format!(
            "{} command targets given, at most {MAX_TARGETS} allowed",
            targets.len()
        )));
    }
    for target in targets {
        if target.key.trim().is_empty() {
            return Err(DeployError::InvalidConfig("target key cannot be empty".into()));
        }
        if target.values.is_empty() {
            return Err(DeployError::InvalidConfig(format!(
                "target '{}' has no values",
                target.key
            )));
        }
    }
    Ok(())
}

pub(crate) fn targets_value(targets: &[CommandTarget]) -> Value {
    Value::Array(targets.iter().map(CommandTarget::to_value).collect())
}
