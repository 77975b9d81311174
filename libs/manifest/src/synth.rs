//! Whole-stack synthesis.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fleetform_deploy::{CommandTarget, DeployEventPipeline, DeployPipelineConfig};
use fleetform_fleet::{FleetPlan, FleetPlanner, FleetSpec, CLUSTER_NAME_TAG};
use fleetform_template::{
    DeploymentContext, InfrastructureBackend, StackReceipt, Template, TemplateDigest,
};
use tracing::{info, instrument};

use crate::{ContextOverrides, Manifest};

/// One synthesized stack: the template and everything declared into it.
#[derive(Debug, Clone)]
pub struct SynthesizedStack {
    pub context: DeploymentContext,
    pub template: Template,
    pub digest: TemplateDigest,
    pub fleet: FleetPlan,
    pub pipeline: Option<DeployEventPipeline>,
}

/// Resolve the manifest context and synthesize the stack.
pub fn synthesize(manifest: &Manifest, overrides: &ContextOverrides) -> Result<SynthesizedStack> {
    let context = manifest
        .context
        .resolve(overrides)
        .context("invalid deployment context")?;
    synthesize_stack(context, manifest.fleet.clone(), manifest.deploy.as_ref())
}

/// Declare the deploy pipeline (if any), then the fleet, into one template.
///
/// The pipeline goes first so its bucket-read statement and the remote
/// command agent policy land on the fleet's instance role. A pipeline with
/// no targets addresses every member of the cluster.
#[instrument(skip(fleet, deploy), fields(stack = context.stack_name()))]
pub fn synthesize_stack(
    context: DeploymentContext,
    mut fleet: FleetSpec,
    deploy: Option<&DeployPipelineConfig>,
) -> Result<SynthesizedStack> {
    let mut template = Template::new();

    let pipeline = match deploy {
        Some(config) => {
            let mut config = config.clone();
            if config.targets.is_empty() {
                config.targets = vec![CommandTarget::tag(
                    CLUSTER_NAME_TAG,
                    [fleet.cluster_name(&context)],
                )];
            }

            let pipeline = DeployEventPipeline::declare(&context, &config, &mut template)
                .context("invalid deploy pipeline")?;
            fleet = fleet
                .with_instance_statement(pipeline.instance_access_policy())
                .with_managed_policy(pipeline.instance_managed_policy_arn());
            Some(pipeline)
        }
        None => None,
    };

    let plan = FleetPlanner::new(&context, fleet)
        .validate()
        .context("invalid fleet")?
        .plan(&mut template)
        .context("failed to plan fleet")?;

    let digest = template.digest()?;

    info!(
        resources = template.len(),
        digest = %digest,
        cluster = %plan.cluster_name,
        pipeline = pipeline.is_some(),
        "stack synthesized"
    );

    Ok(SynthesizedStack {
        context,
        template,
        digest,
        fleet: plan,
        pipeline,
    })
}

impl SynthesizedStack {
    /// Hand the template to `backend`.
    #[instrument(skip(self, backend), fields(stack = self.context.stack_name(), digest = %self.digest))]
    pub async fn deploy<B>(&self, backend: &B) -> Result<StackReceipt>
    where
        B: InfrastructureBackend + ?Sized,
    {
        let receipt = backend
            .apply(&self.context, &self.template)
            .await
            .with_context(|| format!("failed to deploy stack {}", self.context.stack_name()))?;

        info!(
            stack_id = %receipt.stack_id,
            revision = receipt.revision,
            changed = receipt.changed,
            "stack deployed"
        );
        Ok(receipt)
    }

    /// Write `{stack}.template.json` into `dir` and return its path.
    pub fn write_template(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.template.json", self.context.stack_name()));
        let json = self.template.to_json_pretty()?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write template: {}", path.display()))?;
        Ok(path)
    }
}
