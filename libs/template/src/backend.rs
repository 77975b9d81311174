//! Infrastructure backend seam.
//!
//! A backend accepts a whole template for a stack and returns stable handles
//! for what it created. Redeploying re-submits the full template; there is no
//! partial-update protocol.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fleetform_id::LogicalId;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::{DeploymentContext, Template, TemplateDigest, TemplateError};

/// Errors returned by an infrastructure backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend refused the template.
    #[error("template rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached or failed internally.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The template could not be serialized.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// What a backend hands back after accepting a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackReceipt {
    /// ARN-like stack identifier; stable across redeploys of the same stack.
    pub stack_id: String,

    /// Digest of the template that was applied.
    pub digest: TemplateDigest,

    /// Number of times this stack has been applied, starting at 1.
    pub revision: u64,

    /// False when the template was byte-identical to the previous revision.
    pub changed: bool,

    /// Physical id per logical id.
    pub physical_ids: BTreeMap<LogicalId, String>,
}

impl StackReceipt {
    pub fn physical_id(&self, id: &LogicalId) -> Option<&str> {
        self.physical_ids.get(id).map(String::as_str)
    }
}

/// Accepts resource graphs and returns stable identifiers.
#[async_trait]
pub trait InfrastructureBackend: Send + Sync {
    /// Create or replace the stack named by `context` with `template`.
    async fn apply(
        &self,
        context: &DeploymentContext,
        template: &Template,
    ) -> Result<StackReceipt, BackendError>;
}

#[derive(Debug, Clone)]
struct StoredStack {
    template: Template,
    digest: TemplateDigest,
    revision: u64,
}

/// Backend that keeps applied templates in memory.
///
/// Physical ids derive from the stack and logical id only, so they survive
/// template changes the way real stack updates keep resource identity.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    stacks: RwLock<BTreeMap<String, StoredStack>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The template most recently applied to a stack.
    pub async fn template(&self, stack_name: &str) -> Option<Template> {
        self.stacks
            .read()
            .await
            .get(stack_name)
            .map(|s| s.template.clone())
    }

    /// Current revision of a stack, 0 if it was never applied.
    pub async fn revision(&self, stack_name: &str) -> u64 {
        self.stacks
            .read()
            .await
            .get(stack_name)
            .map(|s| s.revision)
            .unwrap_or(0)
    }
}

#[async_trait]
impl InfrastructureBackend for InMemoryBackend {
    #[instrument(skip(self, template), fields(stack = %context.stack_name()))]
    async fn apply(
        &self,
        context: &DeploymentContext,
        template: &Template,
    ) -> Result<StackReceipt, BackendError> {
        if template.is_empty() {
            return Err(BackendError::Rejected(
                "at least one resource must be declared".to_string(),
            ));
        }

        let digest = template.digest()?;
        let stack_name = context.stack_name().to_string();

        let mut stacks = self.stacks.write().await;
        let previous = stacks.get(&stack_name);
        let changed = previous.map(|p| p.digest != digest).unwrap_or(true);
        let revision = previous.map(|p| p.revision).unwrap_or(0) + 1;

        let physical_ids = template
            .resources()
            .map(|(id, _)| (id.clone(), physical_id(&stack_name, id)))
            .collect::<BTreeMap<_, _>>();

        stacks.insert(
            stack_name.clone(),
            StoredStack {
                template: template.clone(),
                digest: digest.clone(),
                revision,
            },
        );

        let stack_id = context.arn(
            "cloudformation",
            &format!("stack/{}/{}", stack_name, short_hash(&stack_name)),
        );

        if changed {
            info!(
                revision,
                resources = physical_ids.len(),
                digest = %digest,
                "Stack applied"
            );
        } else {
            debug!(revision, "Stack unchanged");
        }

        Ok(StackReceipt {
            stack_id,
            digest,
            revision,
            changed,
            physical_ids,
        })
    }
}

fn physical_id(stack_name: &str, id: &LogicalId) -> String {
    format!(
        "{}-{}-{}",
        stack_name,
        id,
        short_hash(&format!("{stack_name}/{id}"))
    )
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(&hasher.finalize()[..6])
}
