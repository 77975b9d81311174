//! Intrinsic function helpers.
//!
//! `Ref` and `Fn::GetAtt` live on the handles in `fleetform-id`; this module
//! covers the string-building intrinsics.

use serde_json::{json, Value};

/// `{"Fn::Join": [delimiter, parts]}`
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// `{"Fn::Sub": template}` for `${LogicalId}` substitution.
pub fn sub(template: impl Into<String>) -> Value {
    json!({ "Fn::Sub": template.into() })
}

/// Dynamic reference to a parameter-store value, resolved at deploy time.
pub fn resolve_ssm_parameter(path: &str) -> String {
    format!("{{{{resolve:ssm:{path}}}}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        let value = join("", vec![json!("arn:"), json!({"Ref": "Doc"})]);
        assert_eq!(value, json!({"Fn::Join": ["", ["arn:", {"Ref": "Doc"}]]}));
    }

    #[test]
    fn test_sub() {
        assert_eq!(
            sub("autoScalingGroup/${FleetAutoScalingGroup}"),
            json!({"Fn::Sub": "autoScalingGroup/${FleetAutoScalingGroup}"})
        );
    }

    #[test]
    fn test_resolve_ssm_parameter() {
        assert_eq!(
            resolve_ssm_parameter("/aws/service/ecs/optimized-ami/amazon-linux-2/recommended/image_id"),
            "{{resolve:ssm:/aws/service/ecs/optimized-ami/amazon-linux-2/recommended/image_id}}"
        );
    }
}
