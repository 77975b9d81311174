//! Remote-command deployment document.
//!
//! The document syncs `s3://{bucket}/{prefix}` into the working directory and
//! runs every file under `bin/`. Sync-then-execute is idempotent, so
//! overlapping runs on one member are safe.

use fleetform_template::shell::validate_shell_word;
use fleetform_template::DeploymentContext;
use serde_json::{json, Value};

use crate::DeployError;

pub const SCHEMA_VERSION: &str = "2.2";
pub const WORKING_DIRECTORY: &str = "/home/ec2-user";
pub const TIMEOUT_SECONDS: u32 = 60;
pub const STEP_ACTION: &str = "aws:runShellScript";
pub const STEP_NAME: &str = "runShellScript";

/// A built remote-command document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommandDocument {
    sync_path: String,
    commands: Vec<String>,
}

impl RemoteCommandDocument {
    /// `{bucket}/{prefix}`, or just the bucket for an empty prefix.
    pub fn sync_path(&self) -> &str {
        &self.sync_path
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Document content as written into the template.
    pub fn content(&self) -> Value {
        json!({
            "schemaVersion": SCHEMA_VERSION,
            "description": format!("Sync s3://{} and run bin/", self.sync_path),
            "mainSteps": [{
                "action": STEP_ACTION,
                "name": STEP_NAME,
                "inputs": {
                    "runCommand": self.commands,
                    "workingDirectory": WORKING_DIRECTORY,
                    "timeoutSeconds": TIMEOUT_SECONDS.to_string(),
                },
            }],
        })
    }

    /// Serialized content. Identical input gives identical bytes.
    pub fn to_json(&self) -> String {
        self.content().to_string()
    }
}

/// Builds [`RemoteCommandDocument`]s for one deployment context.
#[derive(Debug, Clone, Copy)]
pub struct DeploymentDocumentBuilder<'a> {
    context: &'a DeploymentContext,
}

impl<'a> DeploymentDocumentBuilder<'a> {
    pub fn new(context: &'a DeploymentContext) -> Self {
        Self { context }
    }

    pub fn build(&self, bucket: &str, key_prefix: &str) -> Result<RemoteCommandDocument, DeployError> {
        validate_shell_word(bucket, "bucket name")?;
        if bucket.contains('/') {
            return Err(DeployError::InvalidConfig(format!(
                "bucket name '{bucket}' cannot contain '/'"
            )));
        }

        let prefix = normalize_prefix(key_prefix);
        let sync_path = if prefix.is_empty() {
            bucket.to_string()
        } else {
            validate_shell_word(prefix, "key prefix")?;
            if prefix.split('/').any(|segment| segment == "..") {
                return Err(DeployError::InvalidConfig(format!(
                    "key prefix '{prefix}' cannot contain '..' segments"
                )));
            }
            format!("{bucket}/{prefix}")
        };

        let region = self.context.region();
        let commands = vec![
            "set -eux".to_string(),
            format!(
                "aws --region {region} s3 sync --delete --exact-timestamps s3://{sync_path} {sync_path}"
            ),
            format!("cd {sync_path}"),
            "chmod -R +x bin/".to_string(),
            "find bin/ -type f | xargs -n 1 bash".to_string(),
        ];

        Ok(RemoteCommandDocument { sync_path, commands })
    }
}

/// Trim leading and trailing `/` from a key prefix.
pub fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_matches('/')
}
