//! Launch template construction.

use fleetform_id::{InstanceProfileHandle, LaunchTemplateHandle, ResourceHandle, SecurityGroupHandle};
use fleetform_template::{Resource, Tag};
use serde_json::{json, Value};

use crate::{BootScript, CapacityDistribution, FleetSpec, InstanceShape};

/// Tag key carrying the cluster name on every member.
pub const CLUSTER_NAME_TAG: &str = "ClusterName";

/// Everything a new member is launched with. Built once.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    image_id: String,
    primary_shape: InstanceShape,
    security_group: SecurityGroupHandle,
    instance_profile: InstanceProfileHandle,
    tags: Vec<Tag>,
    user_data: BootScript,
}

impl LaunchPlan {
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn primary_shape(&self) -> &InstanceShape {
        &self.primary_shape
    }

    pub fn security_group(&self) -> &SecurityGroupHandle {
        &self.security_group
    }

    pub fn instance_profile(&self) -> &InstanceProfileHandle {
        &self.instance_profile
    }

    /// `ClusterName` first, then caller tags.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn user_data(&self) -> &BootScript {
        &self.user_data
    }

    /// The launch template resource.
    pub fn to_resource(&self) -> Resource {
        let tag_spec = |resource_type: &str| {
            json!({
                "ResourceType": resource_type,
                "Tags": self.tags,
            })
        };

        Resource::of::<LaunchTemplateHandle>().with_property(
            "LaunchTemplateData",
            json!({
                "IamInstanceProfile": { "Name": self.instance_profile.reference() },
                "ImageId": self.image_id,
                "InstanceType": self.primary_shape.to_string(),
                "SecurityGroupIds": [self.security_group.attribute("GroupId")],
                "TagSpecifications": [tag_spec("instance"), tag_spec("volume")],
                "UserData": self.user_data.encode(),
            }),
        )
    }

    /// `Version` reference to the template's latest version.
    pub fn latest_version(template: &LaunchTemplateHandle) -> Value {
        template.attribute("LatestVersionNumber")
    }
}

/// Builds a [`LaunchPlan`] from a validated spec.
#[derive(Debug, Clone)]
pub struct LaunchPlanBuilder<'a> {
    spec: &'a FleetSpec,
    distribution: &'a CapacityDistribution,
}

impl<'a> LaunchPlanBuilder<'a> {
    pub fn new(spec: &'a FleetSpec, distribution: &'a CapacityDistribution) -> Self {
        Self { spec, distribution }
    }

    pub fn build(
        &self,
        cluster_name: &str,
        security_group: SecurityGroupHandle,
        instance_profile: InstanceProfileHandle,
        user_data: BootScript,
    ) -> LaunchPlan {
        let mut tags = Vec::with_capacity(self.spec.tags.len() + 1);
        tags.push(Tag::new(CLUSTER_NAME_TAG, cluster_name));
        tags.extend(self.spec.tags.iter().map(|(k, v)| Tag::new(k, v)));

        LaunchPlan {
            image_id: self.spec.image.image_id(),
            primary_shape: self.distribution.primary_shape().clone(),
            security_group,
            instance_profile,
            tags,
            user_data,
        }
    }
}
