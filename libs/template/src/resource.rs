//! Resource descriptors.

use fleetform_id::{LogicalId, ResourceHandle};
use serde::Serialize;
use serde_json::{Map, Value};

/// One declared resource: type, properties, and orchestration attributes.
///
/// Built once with its final shape; there is no override or patch step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_policy: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<Value>,
}

impl Resource {
    /// Empty resource of the type `H` points at.
    pub fn of<H: ResourceHandle>() -> Self {
        Self {
            resource_type: H::RESOURCE_TYPE.to_string(),
            properties: Map::new(),
            depends_on: Vec::new(),
            creation_policy: None,
            update_policy: None,
        }
    }

    /// Set one property.
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Merge every key of a JSON object into the properties.
    ///
    /// Non-object values are ignored.
    pub fn with_properties(mut self, properties: Value) -> Self {
        if let Value::Object(map) = properties {
            self.properties.extend(map);
        }
        self
    }

    pub fn depends_on(mut self, handle: &impl ResourceHandle) -> Self {
        self.depends_on.push(handle.logical_id().clone());
        self
    }

    pub fn with_creation_policy(mut self, policy: Value) -> Self {
        self.creation_policy = Some(policy);
        self
    }

    pub fn with_update_policy(mut self, policy: Value) -> Self {
        self.update_policy = Some(policy);
        self
    }

    /// Look up a property by key.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}
