//! Logical ids and the typed handles built on them.
//!
//! Each handle type is bound to one template resource type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::define_handle;
use crate::IdError;

/// Maximum logical id length accepted by the template engine.
pub const MAX_LOGICAL_ID_LEN: usize = 255;

/// A validated logical resource id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalId(String);

impl LogicalId {
    /// Parses a logical id, rejecting anything the template engine would reject.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }

        if s.len() > MAX_LOGICAL_ID_LEN {
            return Err(IdError::TooLong {
                len: s.len(),
                max: MAX_LOGICAL_ID_LEN,
            });
        }

        if let Some(found) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(IdError::InvalidCharacter {
                id: s.to_string(),
                found,
            });
        }

        Ok(Self(s.to_string()))
    }

    /// Builds a scoped id by appending `suffix` to `scope`.
    pub fn scoped(scope: &str, suffix: &str) -> Result<Self, IdError> {
        Self::parse(&format!("{scope}{suffix}"))
    }

    /// Builds a child id under this id.
    pub fn child(&self, suffix: &str) -> Result<Self, IdError> {
        Self::scoped(&self.0, suffix)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{"Ref": id}`
    #[must_use]
    pub fn reference(&self) -> Value {
        json!({ "Ref": self.0 })
    }

    /// `{"Fn::GetAtt": [id, attribute]}`
    #[must_use]
    pub fn attribute(&self, attribute: &str) -> Value {
        json!({ "Fn::GetAtt": [self.0, attribute] })
    }
}

impl std::fmt::Display for LogicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LogicalId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LogicalId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LogicalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A handle to a declared resource of a known type.
pub trait ResourceHandle {
    /// The template type string, e.g. `AWS::S3::Bucket`.
    const RESOURCE_TYPE: &'static str;

    /// The logical id the resource was declared under.
    fn logical_id(&self) -> &LogicalId;

    /// `{"Ref": id}` for this resource.
    fn reference(&self) -> Value {
        self.logical_id().reference()
    }

    /// `{"Fn::GetAtt": [id, attribute]}` for this resource.
    fn attribute(&self, attribute: &str) -> Value {
        self.logical_id().attribute(attribute)
    }
}

// =============================================================================
// Compute
// =============================================================================

define_handle!(ClusterHandle, "AWS::ECS::Cluster");
define_handle!(SecurityGroupHandle, "AWS::EC2::SecurityGroup");
define_handle!(LaunchTemplateHandle, "AWS::EC2::LaunchTemplate");
define_handle!(AutoScalingGroupHandle, "AWS::AutoScaling::AutoScalingGroup");
define_handle!(ScalingPlanHandle, "AWS::AutoScalingPlans::ScalingPlan");

// =============================================================================
// Identity
// =============================================================================

define_handle!(RoleHandle, "AWS::IAM::Role");
define_handle!(InstanceProfileHandle, "AWS::IAM::InstanceProfile");
define_handle!(ManagedPolicyHandle, "AWS::IAM::ManagedPolicy");

// =============================================================================
// Storage and Audit
// =============================================================================

define_handle!(BucketHandle, "AWS::S3::Bucket");
define_handle!(BucketPolicyHandle, "AWS::S3::BucketPolicy");
define_handle!(TrailHandle, "AWS::CloudTrail::Trail");

// =============================================================================
// Remote Commands and Events
// =============================================================================

define_handle!(DocumentHandle, "AWS::SSM::Document");
define_handle!(AssociationHandle, "AWS::SSM::Association");
define_handle!(RuleHandle, "AWS::Events::Rule");
