//! Caller-facing fleet specification.

use std::collections::BTreeMap;

use fleetform_template::intrinsic::resolve_ssm_parameter;
use fleetform_template::{DeploymentContext, PolicyStatement};
use serde::{Deserialize, Serialize};

use crate::{FleetError, InstanceShape, ScalingSpec};

/// Parameter-store path of the recommended container-optimized image.
pub const ECS_OPTIMIZED_IMAGE_PARAMETER: &str =
    "/aws/service/ecs/optimized-ami/amazon-linux-2/recommended/image_id";

/// Where members are placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Network the security group is created in.
    pub vpc_id: String,
    /// Subnets the scaling group spans.
    pub subnet_ids: Vec<String>,
}

impl NetworkSpec {
    pub fn new<I, S>(vpc_id: impl Into<String>, subnet_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vpc_id: vpc_id.into(),
            subnet_ids: subnet_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), FleetError> {
        if self.vpc_id.trim().is_empty() {
            return Err(FleetError::InvalidNetwork("vpc_id cannot be empty".into()));
        }
        if self.subnet_ids.is_empty() {
            return Err(FleetError::InvalidNetwork(
                "at least one subnet is required".into(),
            ));
        }
        if self.subnet_ids.iter().any(|s| s.trim().is_empty()) {
            return Err(FleetError::InvalidNetwork(
                "subnet ids cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Machine image for members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSpec {
    /// A concrete image id.
    Id(String),
    /// A parameter-store path resolved at deploy time.
    Parameter(String),
}

impl Default for ImageSpec {
    fn default() -> Self {
        ImageSpec::Parameter(ECS_OPTIMIZED_IMAGE_PARAMETER.to_string())
    }
}

impl ImageSpec {
    pub fn validate(&self) -> Result<(), FleetError> {
        match self {
            ImageSpec::Id(id) if id.trim().is_empty() => {
                Err(FleetError::InvalidImage("image id cannot be empty".into()))
            }
            ImageSpec::Parameter(path) if !path.starts_with('/') => Err(FleetError::InvalidImage(
                format!("parameter path '{path}' must start with '/'"),
            )),
            _ => Ok(()),
        }
    }

    /// The `ImageId` value written into the launch template.
    pub fn image_id(&self) -> String {
        match self {
            ImageSpec::Id(id) => id.clone(),
            ImageSpec::Parameter(path) => resolve_ssm_parameter(path),
        }
    }
}

/// A worker fleet request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSpec {
    pub network: NetworkSpec,

    /// Requested shapes; the first is the launch template's shape.
    pub shapes: Vec<InstanceShape>,

    /// Cluster name. Defaults to `{stack}-cluster`.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub min_capacity: Option<u32>,

    #[serde(default)]
    pub max_capacity: Option<u32>,

    #[serde(default)]
    pub desired_capacity: Option<u32>,

    /// On-demand share above base capacity. Absent or >= 100 means no spot.
    #[serde(default)]
    pub on_demand_percentage: Option<u32>,

    /// Extra boot commands, run after the built-in stages.
    #[serde(default)]
    pub extra_user_data: Vec<String>,

    /// Tags applied to members and their volumes after `ClusterName`.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub image: ImageSpec,

    /// Managed policies attached to the instance role.
    #[serde(default)]
    pub managed_policy_arns: Vec<String>,

    /// Target-tracking scaling for the group.
    #[serde(default)]
    pub scaling: Option<ScalingSpec>,

    /// Extra statements for the instance role.
    #[serde(skip)]
    pub instance_statements: Vec<PolicyStatement>,
}

impl FleetSpec {
    pub fn new(network: NetworkSpec, shapes: Vec<InstanceShape>) -> Self {
        Self {
            network,
            shapes,
            name: None,
            min_capacity: None,
            max_capacity: None,
            desired_capacity: None,
            on_demand_percentage: None,
            extra_user_data: Vec::new(),
            tags: BTreeMap::new(),
            image: ImageSpec::default(),
            managed_policy_arns: Vec::new(),
            scaling: None,
            instance_statements: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_capacity(mut self, min: Option<u32>, max: Option<u32>, desired: Option<u32>) -> Self {
        self.min_capacity = min;
        self.max_capacity = max;
        self.desired_capacity = desired;
        self
    }

    pub fn with_on_demand_percentage(mut self, pct: u32) -> Self {
        self.on_demand_percentage = Some(pct);
        self
    }

    pub fn with_extra_user_data<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_user_data
            .extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_image(mut self, image: ImageSpec) -> Self {
        self.image = image;
        self
    }

    pub fn with_managed_policy(mut self, arn: impl Into<String>) -> Self {
        self.managed_policy_arns.push(arn.into());
        self
    }

    pub fn with_instance_statement(mut self, statement: PolicyStatement) -> Self {
        self.instance_statements.push(statement);
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingSpec) -> Self {
        self.scaling = Some(scaling);
        self
    }

    /// The requested name, or `{stack}-cluster`.
    pub fn cluster_name(&self, context: &DeploymentContext) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}-cluster", context.stack_name()))
    }

    /// Resolved scaling group bounds: `(min, max, desired)`.
    ///
    /// `min` defaults to 1; `max` defaults to `desired`, else `max(min, 1)`.
    pub fn capacity_bounds(&self) -> Result<(u32, u32, Option<u32>), FleetError> {
        let min = self.min_capacity.unwrap_or(1);
        let desired = self.desired_capacity;
        let max = self
            .max_capacity
            .or(desired)
            .unwrap_or_else(|| min.max(1));

        if max == 0 {
            return Err(FleetError::InvalidCapacity(
                "max capacity must be at least 1".into(),
            ));
        }
        if min > max {
            return Err(FleetError::InvalidCapacity(format!(
                "min capacity {min} exceeds max capacity {max}"
            )));
        }
        if let Some(desired) = desired {
            if desired < min || desired > max {
                return Err(FleetError::InvalidCapacity(format!(
                    "desired capacity {desired} outside [{min}, {max}]"
                )));
            }
        }

        Ok((min, max, desired))
    }
}
