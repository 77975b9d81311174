//! Target-tracking scaling plan for a scaling group.

use fleetform_id::{AutoScalingGroupHandle, ResourceHandle, ScalingPlanHandle};
use fleetform_template::intrinsic::sub;
use fleetform_template::{Resource, Template};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::FleetError;

pub const DEFAULT_TARGET_PERCENTAGE: f64 = 50.0;
pub const ESTIMATED_INSTANCE_WARMUP_SECS: u32 = 300;
pub const SCALABLE_DIMENSION: &str = "autoscaling:autoScalingGroup:DesiredCapacity";
pub const PREDEFINED_METRIC: &str = "ASGAverageCPUUtilization";

/// Tag filter selecting the application the plan applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Scaling plan request. Zero bounds are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingSpec {
    #[serde(default)]
    pub min_capacity: Option<u32>,
    #[serde(default)]
    pub max_capacity: Option<u32>,
    /// Average CPU utilization to hold, in percent.
    #[serde(default)]
    pub target_percentage: Option<f64>,
    /// Empty means "this stack".
    #[serde(default)]
    pub tag_filters: Vec<TagFilter>,
}

impl ScalingSpec {
    /// Resolved `(min, max, target)`.
    pub fn bounds(&self) -> Result<(u32, u32, f64), FleetError> {
        let min = self.min_capacity.filter(|m| *m > 0).unwrap_or(1);
        let max = self.max_capacity.filter(|m| *m > 0).unwrap_or(min);
        let target = self.target_percentage.unwrap_or(DEFAULT_TARGET_PERCENTAGE);

        if max < min {
            return Err(FleetError::InvalidScaling(format!(
                "max capacity {max} is below min capacity {min}"
            )));
        }
        if !(target > 0.0 && target <= 100.0) {
            return Err(FleetError::InvalidScaling(format!(
                "target utilization {target} must be in (0, 100]"
            )));
        }

        Ok((min, max, target))
    }
}

/// Builds the scaling plan resource for one scaling group.
#[derive(Debug, Clone)]
pub struct ScalingPlanBuilder<'a> {
    target: &'a AutoScalingGroupHandle,
    spec: &'a ScalingSpec,
}

impl<'a> ScalingPlanBuilder<'a> {
    pub fn new(target: &'a AutoScalingGroupHandle, spec: &'a ScalingSpec) -> Self {
        Self { target, spec }
    }

    pub fn build(&self) -> Result<Resource, FleetError> {
        let (min, max, target) = self.spec.bounds()?;

        let application_source = if self.spec.tag_filters.is_empty() {
            json!({ "CloudFormationStackARN": { "Ref": "AWS::StackId" } })
        } else {
            let filters: Vec<Value> = self
                .spec
                .tag_filters
                .iter()
                .map(|f| json!({ "Key": f.key, "Values": f.values }))
                .collect();
            json!({ "TagFilters": filters })
        };

        let instruction = json!({
            "MinCapacity": min,
            "MaxCapacity": max,
            "ResourceId": sub(format!("autoScalingGroup/${{{}}}", self.target.logical_id())),
            "ScalableDimension": SCALABLE_DIMENSION,
            "ScalingPolicyUpdateBehavior": "ReplaceExternalPolicies",
            "ServiceNamespace": "autoscaling",
            "TargetTrackingConfigurations": [{
                "EstimatedInstanceWarmup": ESTIMATED_INSTANCE_WARMUP_SECS,
                "PredefinedScalingMetricSpecification": {
                    "PredefinedScalingMetricType": PREDEFINED_METRIC,
                },
                "TargetValue": target,
            }],
        });

        Ok(Resource::of::<ScalingPlanHandle>()
            .with_property("ApplicationSource", application_source)
            .with_property("ScalingInstructions", json!([instruction]))
            .depends_on(self.target))
    }

    /// Build and declare the plan under `handle`.
    pub fn declare(
        &self,
        template: &mut Template,
        handle: ScalingPlanHandle,
    ) -> Result<ScalingPlanHandle, FleetError> {
        let resource = self.build()?;
        debug!(plan = %handle, group = %self.target, "declaring scaling plan");
        Ok(template.declare(handle, resource)?)
    }
}
