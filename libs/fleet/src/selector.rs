//! Instance shape selection against the pricing strategy.

use serde_json::{json, Value};

use crate::{FleetError, InstanceShape};

/// On-demand percentage at or above which no spot capacity is requested.
pub const ON_DEMAND_ONLY_PERCENTAGE: u32 = 100;

/// How capacity is split between pricing models.
///
/// Only [`select_capacity`] builds one, so an on-demand-only distribution
/// always has exactly one shape and a mixed one at least two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityDistribution {
    /// `None` when every member is on-demand.
    on_demand_percentage: Option<u32>,
    primary: InstanceShape,
    shapes: Vec<InstanceShape>,
}

impl CapacityDistribution {
    pub fn is_on_demand_only(&self) -> bool {
        self.on_demand_percentage.is_none()
    }

    /// On-demand share above base capacity; `None` for on-demand-only fleets.
    pub fn on_demand_percentage(&self) -> Option<u32> {
        self.on_demand_percentage
    }

    /// The shape the launch template is built with.
    pub fn primary_shape(&self) -> &InstanceShape {
        &self.primary
    }

    /// Every shape, in request order. The first is the primary shape.
    pub fn shapes(&self) -> &[InstanceShape] {
        &self.shapes
    }

    /// The scaling group property that selects the launch template.
    ///
    /// Returns the property key and its value: `LaunchTemplate` for
    /// on-demand-only fleets, `MixedInstancesPolicy` otherwise.
    pub fn launch_property(&self, template_id: Value, version: Value) -> (&'static str, Value) {
        match self.on_demand_percentage {
            None => (
                "LaunchTemplate",
                json!({
                    "LaunchTemplateId": template_id,
                    "Version": version,
                }),
            ),
            Some(on_demand_percentage) => {
                let overrides: Vec<Value> = self
                    .shapes
                    .iter()
                    .map(|shape| json!({ "InstanceType": shape.to_string() }))
                    .collect();

                (
                    "MixedInstancesPolicy",
                    json!({
                        "InstancesDistribution": {
                            "OnDemandPercentageAboveBaseCapacity": on_demand_percentage,
                        },
                        "LaunchTemplate": {
                            "LaunchTemplateSpecification": {
                                "LaunchTemplateId": template_id,
                                "Version": version,
                            },
                            "Overrides": overrides,
                        },
                    }),
                )
            }
        }
    }
}

/// Validate requested shapes against the on-demand percentage.
///
/// The fleet is on-demand-only when the percentage is absent or at least
/// [`ON_DEMAND_ONLY_PERCENTAGE`]; that mode takes exactly one shape. Any lower
/// percentage (including 0) requests spot capacity and needs two or more
/// shapes to diversify across.
pub fn select_capacity(
    shapes: &[InstanceShape],
    on_demand_percentage: Option<u32>,
) -> Result<CapacityDistribution, FleetError> {
    match on_demand_percentage {
        Some(pct) if pct < ON_DEMAND_ONLY_PERCENTAGE => match shapes {
            [primary, _, ..] => Ok(CapacityDistribution {
                on_demand_percentage: Some(pct),
                primary: primary.clone(),
                shapes: shapes.to_vec(),
            }),
            _ => Err(FleetError::SingleShapeWithSpot {
                count: shapes.len(),
            }),
        },
        _ => match shapes {
            [] => Err(FleetError::NoInstanceShape),
            [shape] => Ok(CapacityDistribution {
                on_demand_percentage: None,
                primary: shape.clone(),
                shapes: vec![shape.clone()],
            }),
            _ => Err(FleetError::MultipleShapesOnDemand {
                count: shapes.len(),
            }),
        },
    }
}
