//! Explicit deployment context.
//!
//! Region, account and stack name are threaded into every builder instead of
//! being read from ambient state.

use serde::{Deserialize, Serialize};

use crate::TemplateError;

/// Maximum stack name length.
const MAX_STACK_NAME_LEN: usize = 128;

/// Where a template is going to be deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawContext", into = "RawContext")]
pub struct DeploymentContext {
    region: String,
    account_id: String,
    stack_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawContext {
    region: String,
    account_id: String,
    stack_name: String,
}

impl TryFrom<RawContext> for DeploymentContext {
    type Error = TemplateError;

    fn try_from(raw: RawContext) -> Result<Self, Self::Error> {
        Self::new(raw.region, raw.account_id, raw.stack_name)
    }
}

impl From<DeploymentContext> for RawContext {
    fn from(ctx: DeploymentContext) -> Self {
        Self {
            region: ctx.region,
            account_id: ctx.account_id,
            stack_name: ctx.stack_name,
        }
    }
}

impl DeploymentContext {
    /// Create a validated context.
    pub fn new(
        region: impl Into<String>,
        account_id: impl Into<String>,
        stack_name: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let region = region.into();
        let account_id = account_id.into();
        let stack_name = stack_name.into();

        validate_region(&region)?;
        validate_account_id(&account_id)?;
        validate_stack_name(&stack_name)?;

        Ok(Self {
            region,
            account_id,
            stack_name,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// ARN partition for the region.
    pub fn partition(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "aws-cn"
        } else if self.region.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }

    /// `arn:{partition}:{service}:{region}:{account}:{resource}`
    pub fn arn(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:{}:{}:{}:{}:{}",
            self.partition(),
            service,
            self.region,
            self.account_id,
            resource
        )
    }

    /// ARN with wildcard account, used for policy resources.
    pub fn arn_any_account(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:{}:{}:{}:*:{}",
            self.partition(),
            service,
            self.region,
            resource
        )
    }

    /// ARN for an object-storage bucket or key (no region or account).
    pub fn s3_arn(&self, bucket_and_key: &str) -> String {
        format!("arn:{}:s3:::{}", self.partition(), bucket_and_key)
    }
}

fn validate_region(region: &str) -> Result<(), TemplateError> {
    let valid = !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && region.contains('-');
    if !valid {
        return Err(TemplateError::InvalidContext {
            field: "region",
            reason: format!("'{region}' is not a region code like us-east-1"),
        });
    }
    Ok(())
}

fn validate_account_id(account_id: &str) -> Result<(), TemplateError> {
    if account_id.len() != 12 || !account_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(TemplateError::InvalidContext {
            field: "account_id",
            reason: format!("'{account_id}' must be exactly 12 digits"),
        });
    }
    Ok(())
}

fn validate_stack_name(stack_name: &str) -> Result<(), TemplateError> {
    let mut chars = stack_name.chars();
    let Some(first) = chars.next() else {
        return Err(TemplateError::InvalidContext {
            field: "stack_name",
            reason: "cannot be empty".to_string(),
        });
    };

    if !first.is_ascii_alphabetic() {
        return Err(TemplateError::InvalidContext {
            field: "stack_name",
            reason: format!("'{stack_name}' must start with a letter"),
        });
    }

    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
        return Err(TemplateError::InvalidContext {
            field: "stack_name",
            reason: format!("'{stack_name}' contains forbidden character {bad:?}"),
        });
    }

    if stack_name.len() > MAX_STACK_NAME_LEN {
        return Err(TemplateError::InvalidContext {
            field: "stack_name",
            reason: format!("longer than {MAX_STACK_NAME_LEN} characters"),
        });
    }

    Ok(())
}
