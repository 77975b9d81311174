//! IAM policy documents.
//!
//! Statements are plain data; attaching them to principals is the backend's job.

use serde::Serialize;
use serde_json::{json, Value};

/// Policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Value>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl PolicyStatement {
    /// An empty `Allow` statement.
    pub fn allow() -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            principal: None,
            action: Vec::new(),
            resource: Vec::new(),
            condition: None,
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_service_principal(mut self, service: &str) -> Self {
        self.principal = Some(json!({ "Service": service }));
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Add a resource; plain strings and intrinsics are both accepted.
    pub fn with_resource(mut self, resource: impl Into<Value>) -> Self {
        self.resource.push(resource.into());
        self
    }

    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Grant on every resource.
    pub fn on_all_resources(self) -> Self {
        self.with_resource("*")
    }
}

/// A policy document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statement,
        }
    }

    /// Trust policy allowing a service principal to assume a role.
    pub fn assume_role(service: &str) -> Self {
        Self::new(vec![PolicyStatement::allow()
            .with_service_principal(service)
            .with_actions(["sts:AssumeRole"])])
    }

    pub fn is_empty(&self) -> bool {
        self.statement.is_empty()
    }

    pub fn to_value(&self) -> Value {
        // Infallible: string keys and plain data only.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
