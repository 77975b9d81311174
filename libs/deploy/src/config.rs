//! Deploy pipeline configuration.

use fleetform_events::ScheduleExpression;
use fleetform_template::DeploymentContext;
use serde::{Deserialize, Serialize};

use crate::document::normalize_prefix;
use crate::{CommandTarget, DeployError};

const MIN_BUCKET_NAME_LEN: usize = 3;
const MAX_BUCKET_NAME_LEN: usize = 63;

/// What to deploy, where it lives, and which members receive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployPipelineConfig {
    /// Local directory uploaded to the bucket; also the default key prefix.
    pub source_path: String,

    /// Existing bucket to watch. A private bucket is declared when absent.
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Recurring fallback trigger.
    #[serde(default)]
    pub schedule: Option<ScheduleExpression>,

    /// Members the command is sent to.
    #[serde(default)]
    pub targets: Vec<CommandTarget>,
}

impl DeployPipelineConfig {
    pub fn new(source_path: impl Into<String>, targets: Vec<CommandTarget>) -> Self {
        Self {
            source_path: source_path.into(),
            bucket: None,
            key_prefix: None,
            schedule: None,
            targets,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleExpression) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Key prefix, falling back to the source path, without edge slashes.
    pub fn key_prefix(&self) -> &str {
        normalize_prefix(self.key_prefix.as_deref().unwrap_or(&self.source_path))
    }

    /// Whether the pipeline declares its own bucket.
    pub fn owns_bucket(&self) -> bool {
        self.bucket.is_none()
    }

    /// The bucket name the pipeline watches.
    ///
    /// A declared bucket is named `{stack}-deploy-{account}-{region}` so the
    /// event rule can match it by name.
    pub fn bucket_name(&self, context: &DeploymentContext) -> Result<String, DeployError> {
        let name = match &self.bucket {
            Some(name) => name.clone(),
            None => format!(
                "{}-deploy-{}-{}",
                context.stack_name(),
                context.account_id(),
                context.region()
            )
            .to_lowercase(),
        };
        validate_bucket_name(&name)?;
        Ok(name)
    }
}

fn validate_bucket_name(name: &str) -> Result<(), DeployError> {
    let invalid = |reason: String| DeployError::InvalidBucketName {
        name: name.to_string(),
        reason,
    };

    if name.len() < MIN_BUCKET_NAME_LEN || name.len() > MAX_BUCKET_NAME_LEN {
        return Err(invalid(format!(
            "length must be {MIN_BUCKET_NAME_LEN}-{MAX_BUCKET_NAME_LEN}, got {}",
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            "only lowercase letters, digits, '-' and '.' are allowed".into(),
        ));
    }
    let edges_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edges_ok(name.chars().next()) || !edges_ok(name.chars().last()) {
        return Err(invalid("must start and end with a letter or digit".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn context() -> DeploymentContext {
        DeploymentContext::new("us-east-1", "123456789012", "Workers").unwrap()
    }

    fn config() -> DeployPipelineConfig {
        DeployPipelineConfig::new("/scripts/", vec![CommandTarget::tag("ClusterName", ["c"])])
    }

    #[test]
    fn test_default_bucket_name_is_lowercase() {
        assert_eq!(
            config().bucket_name(&context()).unwrap(),
            "workers-deploy-123456789012-us-east-1"
        );
        assert!(config().owns_bucket());
    }

    #[test]
    fn test_explicit_bucket() {
        let cfg = config().with_bucket("existing-bucket");
        assert_eq!(cfg.bucket_name(&context()).unwrap(), "existing-bucket");
        assert!(!cfg.owns_bucket());
    }

    #[test]
    fn test_derived_name_too_long() {
        let ctx = DeploymentContext::new("us-east-1", "123456789012", "a".repeat(60)).unwrap();
        assert!(matches!(
            config().bucket_name(&ctx),
            Err(DeployError::InvalidBucketName { .. })
        ));
    }

    #[rstest]
    #[case("ab")]
    #[case("Upper-Case")]
    #[case("-leading")]
    #[case("trailing.")]
    #[case("under_score")]
    fn test_invalid_bucket_names(#[case] name: &str) {
        assert!(config().with_bucket(name).bucket_name(&context()).is_err());
    }

    #[test]
    fn test_key_prefix_defaults_to_source() {
        assert_eq!(config().key_prefix(), "scripts");
        assert_eq!(config().with_key_prefix("/other/app/").key_prefix(), "other/app");
    }

    #[test]
    fn test_deserialize_with_schedule() {
        let cfg: DeployPipelineConfig = serde_json::from_value(serde_json::json!({
            "source_path": "scripts",
            "schedule": "cron(0 10 ? * * *)",
            "targets": [{"key": "tag:ClusterName", "values": ["c"]}]
        }))
        .unwrap();
        assert_eq!(cfg.schedule.unwrap().to_string(), "cron(0 10 ? * * *)");
        assert!(cfg.bucket.is_none());

        let bad = serde_json::from_value::<DeployPipelineConfig>(serde_json::json!({
            "source_path": "scripts",
            "schedule": "every day"
        }));
        assert!(bad.is_err());
    }
}
