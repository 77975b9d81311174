//! Fleet planner.
//!
//! ```text
//! FleetPlanner<Unvalidated> --validate--> FleetPlanner<Validated> --plan--> FleetPlan
//!            |                                     |
//!            +------------ Err(FleetError) --------+
//! ```
//!
//! A rejected spec never writes to the template. A planner is consumed by
//! `plan`, so a new spec needs a new planner.

use fleetform_id::{
    AutoScalingGroupHandle, ClusterHandle, InstanceProfileHandle, LaunchTemplateHandle,
    LogicalId, ResourceHandle, RoleHandle, ScalingPlanHandle, SecurityGroupHandle,
};
use fleetform_template::shell::validate_shell_input;
use fleetform_template::{DeploymentContext, PolicyDocument, PolicyStatement, Resource, Template};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::{
    select_capacity, BootScriptComposer, CapacityDistribution, FleetError, FleetSpec, LaunchPlan,
    LaunchPlanBuilder, ScalingPlanBuilder, UpdatePolicy,
};

/// Default logical id scope for fleet resources.
pub const DEFAULT_SCOPE: &str = "Fleet";

/// Maximum cluster name length.
const MAX_CLUSTER_NAME_LEN: usize = 255;

/// Actions the container agent needs on the instance role.
const CONTAINER_AGENT_ACTIONS: &[&str] = &[
    "ecs:CreateCluster",
    "ecs:DeregisterContainerInstance",
    "ecs:DiscoverPollEndpoint",
    "ecs:Poll",
    "ecs:RegisterContainerInstance",
    "ecs:StartTelemetrySession",
    "ecs:Submit*",
    "ecr:GetAuthorizationToken",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

/// Planner state before validation.
#[derive(Debug, Clone)]
pub struct Unvalidated;

/// Planner state after validation.
#[derive(Debug, Clone)]
pub struct Validated {
    cluster_name: String,
    distribution: CapacityDistribution,
    update_policy: UpdatePolicy,
    bounds: (u32, u32, Option<u32>),
}

/// Compiles a [`FleetSpec`] into template resources.
#[derive(Debug, Clone)]
pub struct FleetPlanner<'a, S = Unvalidated> {
    context: &'a DeploymentContext,
    scope: String,
    spec: FleetSpec,
    state: S,
}

/// Handles to everything the planner declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetHandles {
    pub cluster: ClusterHandle,
    pub security_group: SecurityGroupHandle,
    pub instance_role: RoleHandle,
    pub instance_profile: InstanceProfileHandle,
    pub launch_template: LaunchTemplateHandle,
    pub auto_scaling_group: AutoScalingGroupHandle,
    pub scaling_plan: Option<ScalingPlanHandle>,
}

/// Result of a successful plan.
#[derive(Debug, Clone)]
pub struct FleetPlan {
    pub handles: FleetHandles,
    pub cluster_name: String,
    pub distribution: CapacityDistribution,
    pub update_policy: UpdatePolicy,
    pub launch_plan: LaunchPlan,
}

impl<'a> FleetPlanner<'a, Unvalidated> {
    pub fn new(context: &'a DeploymentContext, spec: FleetSpec) -> Self {
        Self {
            context,
            scope: DEFAULT_SCOPE.to_string(),
            spec,
            state: Unvalidated,
        }
    }

    /// Prefix for every logical id the planner declares.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Check the spec. No template is touched.
    pub fn validate(self) -> Result<FleetPlanner<'a, Validated>, FleetError> {
        match self.check() {
            Ok(state) => {
                info!(
                    stack = self.context.stack_name(),
                    cluster = %state.cluster_name,
                    on_demand_only = state.distribution.is_on_demand_only(),
                    shapes = state.distribution.shapes().len(),
                    "fleet spec validated"
                );
                Ok(FleetPlanner {
                    context: self.context,
                    scope: self.scope,
                    spec: self.spec,
                    state,
                })
            }
            Err(e) => {
                warn!(stack = self.context.stack_name(), error = %e, "fleet spec rejected");
                Err(e)
            }
        }
    }

    fn check(&self) -> Result<Validated, FleetError> {
        LogicalId::parse(&self.scope)?;

        let distribution = select_capacity(&self.spec.shapes, self.spec.on_demand_percentage)?;
        let bounds = self.spec.capacity_bounds()?;
        self.spec.network.validate()?;
        self.spec.image.validate()?;

        if let Some(scaling) = &self.spec.scaling {
            scaling.bounds()?;
        }

        let cluster_name = self.spec.cluster_name(self.context);
        validate_cluster_name(&cluster_name)?;

        Ok(Validated {
            cluster_name,
            distribution,
            update_policy: UpdatePolicy::from_min_capacity(self.spec.min_capacity),
            bounds,
        })
    }
}

impl<'a> FleetPlanner<'a, Validated> {
    pub fn cluster_name(&self) -> &str {
        &self.state.cluster_name
    }

    pub fn distribution(&self) -> &CapacityDistribution {
        &self.state.distribution
    }

    pub fn update_policy(&self) -> &UpdatePolicy {
        &self.state.update_policy
    }

    /// Declare every fleet resource into `template` in one pass.
    ///
    /// Resources are built into a scratch template first, so a logical id
    /// clash leaves `template` unchanged.
    #[instrument(skip(self, template), fields(stack = self.context.stack_name(), scope = %self.scope))]
    pub fn plan(self, template: &mut Template) -> Result<FleetPlan, FleetError> {
        let ids = ScopedIds::new(&self.scope);
        let mut scratch = Template::new();

        let cluster = scratch.declare(
            ClusterHandle::new(ids.get("Cluster")?),
            Resource::of::<ClusterHandle>().with_property("ClusterName", self.cluster_name()),
        )?;

        let security_group = scratch.declare(
            SecurityGroupHandle::new(ids.get("SecurityGroup")?),
            self.security_group(),
        )?;

        let instance_role = scratch.declare(RoleHandle::new(ids.get("InstanceRole")?), self.instance_role())?;

        let instance_profile = scratch.declare(
            InstanceProfileHandle::new(ids.get("InstanceProfile")?),
            Resource::of::<InstanceProfileHandle>()
                .with_property("Roles", json!([instance_role.reference()])),
        )?;

        let auto_scaling_group = AutoScalingGroupHandle::new(ids.get("AutoScalingGroup")?);

        let user_data = BootScriptComposer::new(self.context, self.cluster_name(), &auto_scaling_group)
            .with_extra_commands(self.spec.extra_user_data.iter().cloned())
            .compose()?;

        let launch_plan = LaunchPlanBuilder::new(&self.spec, self.distribution()).build(
            self.cluster_name(),
            security_group.clone(),
            instance_profile.clone(),
            user_data,
        );

        let launch_template = scratch.declare(
            LaunchTemplateHandle::new(ids.get("LaunchTemplate")?),
            launch_plan.to_resource(),
        )?;

        let auto_scaling_group = scratch.declare(
            auto_scaling_group,
            self.auto_scaling_group(&launch_template),
        )?;

        let scaling_plan = match &self.spec.scaling {
            Some(scaling) => Some(
                ScalingPlanBuilder::new(&auto_scaling_group, scaling)
                    .declare(&mut scratch, ScalingPlanHandle::new(ids.get("ScalingPlan")?))?,
            ),
            None => None,
        };

        scratch.output(ids.get("ClusterName")?, cluster.reference(), Some("Container cluster name"))?;
        scratch.output(
            ids.get("AutoScalingGroupName")?,
            auto_scaling_group.reference(),
            Some("Scaling group name"),
        )?;

        let declared = scratch.len();
        template.absorb(scratch)?;

        info!(
            resources = declared,
            group = %auto_scaling_group,
            min_in_service = self.state.update_policy.min_in_service(),
            "fleet planned"
        );

        Ok(FleetPlan {
            handles: FleetHandles {
                cluster,
                security_group,
                instance_role,
                instance_profile,
                launch_template,
                auto_scaling_group,
                scaling_plan,
            },
            cluster_name: self.state.cluster_name,
            distribution: self.state.distribution,
            update_policy: self.state.update_policy,
            launch_plan,
        })
    }

    fn security_group(&self) -> Resource {
        Resource::of::<SecurityGroupHandle>()
            .with_property(
                "GroupDescription",
                format!("{}/{} instance security group", self.context.stack_name(), self.scope),
            )
            .with_property("VpcId", self.spec.network.vpc_id.as_str())
            .with_property(
                "SecurityGroupEgress",
                json!([{
                    "CidrIp": "0.0.0.0/0",
                    "Description": "Allow all outbound traffic by default",
                    "IpProtocol": "-1",
                }]),
            )
    }

    fn instance_role(&self) -> Resource {
        let mut statements = vec![
            PolicyStatement::allow()
                .with_actions(["ec2:CreateTags", "ec2:DescribeInstances"])
                .on_all_resources(),
            PolicyStatement::allow()
                .with_actions(CONTAINER_AGENT_ACTIONS.iter().copied())
                .on_all_resources(),
        ];
        statements.extend(self.spec.instance_statements.iter().cloned());

        let mut role = Resource::of::<RoleHandle>()
            .with_property(
                "AssumeRolePolicyDocument",
                PolicyDocument::assume_role("ec2.amazonaws.com").to_value(),
            )
            .with_property(
                "Policies",
                json!([{
                    "PolicyName": "InstancePolicy",
                    "PolicyDocument": PolicyDocument::new(statements).to_value(),
                }]),
            );

        if !self.spec.managed_policy_arns.is_empty() {
            role = role.with_property("ManagedPolicyArns", json!(self.spec.managed_policy_arns));
        }
        role
    }

    fn auto_scaling_group(&self, launch_template: &LaunchTemplateHandle) -> Resource {
        let (min, max, desired) = self.state.bounds;
        let (launch_key, launch_value) = self
            .distribution()
            .launch_property(launch_template.reference(), LaunchPlan::latest_version(launch_template));

        debug!(launch_key, min, max, ?desired, "building scaling group");

        let mut group = Resource::of::<AutoScalingGroupHandle>()
            .with_property("MinSize", min.to_string())
            .with_property("MaxSize", max.to_string())
            .with_property("VPCZoneIdentifier", json!(self.spec.network.subnet_ids))
            .with_property(launch_key, launch_value)
            .with_creation_policy(self.state.update_policy.creation_policy())
            .with_update_policy(self.state.update_policy.update_policy());

        if let Some(desired) = desired {
            group = group.with_property("DesiredCapacity", desired.to_string());
        }
        group
    }
}

fn validate_cluster_name(name: &str) -> Result<(), FleetError> {
    validate_shell_input(name, "cluster name")?;

    let valid = name.len() <= MAX_CLUSTER_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(FleetError::InvalidClusterName(format!(
            "'{name}' must be 1-{MAX_CLUSTER_NAME_LEN} letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

/// Logical ids under one scope.
struct ScopedIds<'s> {
    scope: &'s str,
}

impl<'s> ScopedIds<'s> {
    fn new(scope: &'s str) -> Self {
        Self { scope }
    }

    fn get(&self, suffix: &str) -> Result<LogicalId, FleetError> {
        Ok(LogicalId::scoped(self.scope, suffix)?)
    }
}
