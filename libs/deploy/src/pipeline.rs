//! Object-write event pipeline.
//!
//! Two independent triggers run the same deployment document on the same
//! targets:
//!
//! - **Object written**: the audit trail records object-level writes to the
//!   deployment bucket, the bus turns each `PutObject` into an event, and a
//!   rule sends the document to the targets.
//! - **Schedule** (opt-in): an association runs the document on a cadence, so
//!   members that missed an event converge anyway.
//!
//! Delivery is at-least-once and the two paths may overlap; the document is
//! idempotent, so neither path coordinates with the other.

use fleetform_events::{
    BusEvent, EventPattern, ScheduleExpression, DETAIL_TYPE_API_CALL, EVENT_SOURCE_S3, SOURCE_S3,
};
use fleetform_id::{
    AssociationHandle, BucketHandle, BucketPolicyHandle, DocumentHandle, LogicalId,
    ManagedPolicyHandle, ResourceHandle, RoleHandle, RuleHandle, TrailHandle,
};
use fleetform_template::{DeploymentContext, PolicyDocument, PolicyStatement, Resource, Template};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::target::{targets_value, validate_targets};
use crate::{CommandTarget, DeployError, DeployPipelineConfig, DeploymentDocumentBuilder};

/// Default logical id scope for pipeline resources.
pub const DEFAULT_SCOPE: &str = "Deploy";

/// Managed policy members need to run remote commands.
pub const INSTANCE_MANAGED_POLICY: &str = "service-role/AmazonEC2RoleforSSM";

/// Rule target id for the document.
const RULE_TARGET_ID: &str = "DeployCommands";

/// What caused a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// An object was written to the deployment bucket.
    ObjectWritten {
        event_id: Uuid,
        bucket: String,
        key: Option<String>,
    },
    /// The recurring schedule fired.
    Schedule(ScheduleExpression),
}

/// One remote command send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDispatch {
    pub trigger: Trigger,
    pub document_name: String,
    pub document_arn: String,
    pub targets: Vec<CommandTarget>,
}

/// Handles to everything the pipeline declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineHandles {
    /// The deployment bucket, when the pipeline declared it.
    pub bucket: Option<BucketHandle>,
    pub trail_bucket: BucketHandle,
    pub trail_bucket_policy: BucketPolicyHandle,
    pub trail: TrailHandle,
    pub document: DocumentHandle,
    pub event_policy: ManagedPolicyHandle,
    pub event_role: RoleHandle,
    pub rule: RuleHandle,
    pub association: Option<AssociationHandle>,
}

/// A declared deployment pipeline.
#[derive(Debug, Clone)]
pub struct DeployEventPipeline {
    handles: PipelineHandles,
    bucket_name: String,
    key_prefix: String,
    document_name: String,
    document_arn: String,
    pattern: EventPattern,
    targets: Vec<CommandTarget>,
    schedule: Option<ScheduleExpression>,
    partition: &'static str,
}

impl DeployEventPipeline {
    /// Declare the pipeline under [`DEFAULT_SCOPE`].
    pub fn declare(
        context: &DeploymentContext,
        config: &DeployPipelineConfig,
        template: &mut Template,
    ) -> Result<Self, DeployError> {
        Self::declare_scoped(context, config, DEFAULT_SCOPE, template)
    }

    /// Declare the pipeline with logical ids prefixed by `scope`.
    ///
    /// Nothing is written to `template` unless every resource is valid.
    #[instrument(skip_all, fields(stack = context.stack_name(), scope = scope))]
    pub fn declare_scoped(
        context: &DeploymentContext,
        config: &DeployPipelineConfig,
        scope: &str,
        template: &mut Template,
    ) -> Result<Self, DeployError> {
        validate_targets(&config.targets)?;
        let id = |suffix: &str| LogicalId::scoped(scope, suffix);

        let bucket_name = config.bucket_name(context)?;
        let key_prefix = config.key_prefix().to_string();
        let document = DeploymentDocumentBuilder::new(context).build(&bucket_name, &key_prefix)?;
        let document_name = format!("{}-DeployCommands", context.stack_name());
        let document_arn = context.arn("ssm", &format!("document/{document_name}"));
        let pattern = put_object_pattern(&bucket_name)?;
        let targets = targets_value(&config.targets);

        let mut scratch = Template::new();

        let bucket = if config.owns_bucket() {
            Some(scratch.declare(
                BucketHandle::new(id("Bucket")?),
                private_bucket().with_property("BucketName", bucket_name.as_str()),
            )?)
        } else {
            None
        };

        let trail_bucket = scratch.declare(BucketHandle::new(id("TrailBucket")?), private_bucket())?;
        let trail_bucket_policy = scratch.declare(
            BucketPolicyHandle::new(id("TrailBucketPolicy")?),
            Resource::of::<BucketPolicyHandle>()
                .with_property("Bucket", trail_bucket.reference())
                .with_property("PolicyDocument", trail_log_policy(context, &trail_bucket).to_value()),
        )?;

        let trail = scratch.declare(
            TrailHandle::new(id("Trail")?),
            Resource::of::<TrailHandle>()
                .with_property("IsLogging", true)
                .with_property("S3BucketName", trail_bucket.reference())
                .with_property("IsMultiRegionTrail", false)
                .with_property("IncludeGlobalServiceEvents", false)
                .with_property("EnableLogFileValidation", false)
                .with_property(
                    "EventSelectors",
                    json!([{
                        "ReadWriteType": "WriteOnly",
                        "IncludeManagementEvents": true,
                        "DataResources": [{
                            "Type": "AWS::S3::Object",
                            "Values": [format!("{}/", context.s3_arn(&bucket_name))],
                        }],
                    }]),
                )
                .depends_on(&trail_bucket_policy),
        )?;

        let document = scratch.declare(
            DocumentHandle::new(id("Document")?),
            Resource::of::<DocumentHandle>()
                .with_property("Name", document_name.as_str())
                .with_property("DocumentType", "Command")
                .with_property("Content", document.content()),
        )?;

        let event_policy = scratch.declare(
            ManagedPolicyHandle::new(id("EventPolicy")?),
            Resource::of::<ManagedPolicyHandle>().with_property(
                "PolicyDocument",
                PolicyDocument::new(vec![PolicyStatement::allow()
                    .with_actions(["ssm:SendCommand"])
                    .with_resource(context.arn_any_account("ssm", "document/*"))
                    .with_resource(context.arn_any_account("ec2", "instance/*"))])
                .to_value(),
            ),
        )?;

        let event_role = scratch.declare(
            RoleHandle::new(id("EventRole")?),
            Resource::of::<RoleHandle>()
                .with_property(
                    "AssumeRolePolicyDocument",
                    PolicyDocument::assume_role("events.amazonaws.com").to_value(),
                )
                .with_property("ManagedPolicyArns", json!([event_policy.reference()])),
        )?;

        let rule = scratch.declare(
            RuleHandle::new(id("Rule")?),
            Resource::of::<RuleHandle>()
                .with_property("State", "ENABLED")
                .with_property("EventPattern", pattern.as_value())
                .with_property(
                    "Targets",
                    json!([{
                        "Id": RULE_TARGET_ID,
                        "Arn": document_arn,
                        "RoleArn": event_role.attribute("Arn"),
                        "RunCommandParameters": { "RunCommandTargets": targets.clone() },
                    }]),
                )
                .depends_on(&document),
        )?;

        let association = match &config.schedule {
            Some(schedule) => Some(scratch.declare(
                AssociationHandle::new(id("Association")?),
                Resource::of::<AssociationHandle>()
                    .with_property("Name", document.reference())
                    .with_property("ScheduleExpression", schedule.to_string())
                    .with_property("Targets", targets.clone()),
            )?),
            None => None,
        };

        if let Some(bucket) = &bucket {
            scratch.output(id("BucketName")?, bucket.reference(), Some("Deployment bucket"))?;
        }
        scratch.output(id("DocumentName")?, document.reference(), Some("Deployment document"))?;

        template.absorb(scratch)?;

        info!(
            bucket = %bucket_name,
            prefix = %key_prefix,
            document = %document_name,
            scheduled = association.is_some(),
            "deploy pipeline declared"
        );

        Ok(Self {
            handles: PipelineHandles {
                bucket,
                trail_bucket,
                trail_bucket_policy,
                trail,
                document,
                event_policy,
                event_role,
                rule,
                association,
            },
            bucket_name,
            key_prefix,
            document_name,
            document_arn,
            pattern,
            targets: config.targets.clone(),
            schedule: config.schedule.clone(),
            partition: context.partition(),
        })
    }

    pub fn handles(&self) -> &PipelineHandles {
        &self.handles
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn document_arn(&self) -> &str {
        &self.document_arn
    }

    /// The pattern the rule was declared with.
    pub fn pattern(&self) -> &EventPattern {
        &self.pattern
    }

    pub fn targets(&self) -> &[CommandTarget] {
        &self.targets
    }

    pub fn schedule(&self) -> Option<&ScheduleExpression> {
        self.schedule.as_ref()
    }

    /// Evaluate the rule against one bus event.
    ///
    /// Returns at most one dispatch, addressed to the configured targets.
    pub fn route(&self, event: &BusEvent) -> Option<CommandDispatch> {
        if !self.pattern.matches_event(event) {
            debug!(
                event_id = %event.id,
                source = %event.source,
                bucket = event.bucket_name(),
                "event did not match deploy rule"
            );
            return None;
        }

        info!(
            event_id = %event.id,
            key = event.object_key(),
            document = %self.document_name,
            "dispatching deploy command"
        );

        Some(self.dispatch(Trigger::ObjectWritten {
            event_id: event.id,
            bucket: self.bucket_name.clone(),
            key: event.object_key().map(str::to_string),
        }))
    }

    /// The schedule-path dispatch, if a schedule is configured.
    pub fn scheduled_dispatch(&self) -> Option<CommandDispatch> {
        self.schedule
            .clone()
            .map(|schedule| self.dispatch(Trigger::Schedule(schedule)))
    }

    /// Statement fleet members need to read the deployment bucket.
    pub fn instance_access_policy(&self) -> PolicyStatement {
        let bucket_arn = format!("arn:{}:s3:::{}", self.partition, self.bucket_name);
        PolicyStatement::allow()
            .with_actions(["s3:Get*", "s3:List*"])
            .with_resource(bucket_arn.clone())
            .with_resource(format!("{bucket_arn}/*"))
    }

    /// Managed policy ARN members need for the remote command agent.
    pub fn instance_managed_policy_arn(&self) -> String {
        format!("arn:{}:iam::aws:policy/{INSTANCE_MANAGED_POLICY}", self.partition)
    }

    fn dispatch(&self, trigger: Trigger) -> CommandDispatch {
        CommandDispatch {
            trigger,
            document_name: self.document_name.clone(),
            document_arn: self.document_arn.clone(),
            targets: self.targets.clone(),
        }
    }
}

/// Rule pattern for `PutObject` calls on one bucket.
pub fn put_object_pattern(bucket: &str) -> Result<EventPattern, DeployError> {
    Ok(EventPattern::new(json!({
        "source": [SOURCE_S3],
        "detail-type": [DETAIL_TYPE_API_CALL],
        "detail": {
            "eventSource": [EVENT_SOURCE_S3],
            "eventName": ["PutObject"],
            "requestParameters": {
                "bucketName": [bucket],
            },
        },
    }))?)
}

fn private_bucket() -> Resource {
    Resource::of::<BucketHandle>().with_property(
        "PublicAccessBlockConfiguration",
        json!({
            "BlockPublicAcls": true,
            "BlockPublicPolicy": true,
            "IgnorePublicAcls": true,
            "RestrictPublicBuckets": true,
        }),
    )
}

fn trail_log_policy(context: &DeploymentContext, bucket: &BucketHandle) -> PolicyDocument {
    let bucket_arn: Value = bucket.attribute("Arn");
    let log_prefix = fleetform_template::intrinsic::join(
        "",
        vec![
            bucket.attribute("Arn"),
            Value::String(format!("/AWSLogs/{}/*", context.account_id())),
        ],
    );

    PolicyDocument::new(vec![
        PolicyStatement::allow()
            .with_sid("TrailAclCheck")
            .with_service_principal("cloudtrail.amazonaws.com")
            .with_actions(["s3:GetBucketAcl"])
            .with_resource(bucket_arn),
        PolicyStatement::allow()
            .with_sid("TrailWrite")
            .with_service_principal("cloudtrail.amazonaws.com")
            .with_actions(["s3:PutObject"])
            .with_resource(log_prefix)
            .with_condition(json!({
                "StringEquals": { "s3:x-amz-acl": "bucket-owner-full-control" }
            })),
    ])
}
