//! Event patterns.
//!
//! A pattern is a JSON object whose leaves are arrays of accepted values. An
//! event matches when every leaf in the pattern matches the field at the same
//! path. Supported leaf conditions:
//!
//! - exact scalars (`"PutObject"`, `5`, `true`, `null`)
//! - `{"prefix": "bin/"}`
//! - `{"exists": true | false}`
//! - `{"anything-but": scalar | [scalars]}`

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{BusEvent, EventError};

/// A validated event pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPattern(Map<String, Value>);

impl EventPattern {
    /// Validate and wrap a pattern object.
    pub fn new(pattern: Value) -> Result<Self, EventError> {
        let Value::Object(map) = pattern else {
            return Err(EventError::InvalidPattern(
                "pattern must be a JSON object".to_string(),
            ));
        };

        if map.is_empty() {
            return Err(EventError::InvalidPattern(
                "pattern must have at least one field".to_string(),
            ));
        }

        validate_object(&map, "")?;
        Ok(Self(map))
    }

    /// Whether `event` satisfies every condition in the pattern.
    pub fn matches(&self, event: &Value) -> bool {
        match_object(&self.0, event)
    }

    /// Match against a bus event in its delivered JSON form.
    pub fn matches_event(&self, event: &BusEvent) -> bool {
        event.to_value().is_ok_and(|json| self.matches(&json))
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl Serialize for EventPattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

fn validate_object(map: &Map<String, Value>, path: &str) -> Result<(), EventError> {
    for (key, value) in map {
        let field = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };

        match value {
            Value::Object(inner) => validate_object(inner, &field)?,
            Value::Array(conditions) => {
                if conditions.is_empty() {
                    return Err(EventError::InvalidPattern(format!(
                        "{field}: condition list cannot be empty"
                    )));
                }
                for condition in conditions {
                    validate_condition(condition, &field)?;
                }
            }
            _ => {
                return Err(EventError::InvalidPattern(format!(
                    "{field}: leaf values must be arrays"
                )))
            }
        }
    }
    Ok(())
}

fn validate_condition(condition: &Value, field: &str) -> Result<(), EventError> {
    let Value::Object(op) = condition else {
        return match condition {
            Value::Array(_) => Err(EventError::InvalidPattern(format!(
                "{field}: nested arrays are not allowed"
            ))),
            _ => Ok(()),
        };
    };

    if op.len() != 1 {
        return Err(EventError::InvalidPattern(format!(
            "{field}: content filters take exactly one operator"
        )));
    }

    let Some((name, arg)) = op.iter().next() else {
        return Ok(());
    };

    let valid = match name.as_str() {
        "prefix" => arg.is_string(),
        "exists" => arg.is_boolean(),
        "anything-but" => match arg {
            Value::Array(values) => values.iter().all(is_scalar),
            other => is_scalar(other),
        },
        _ => {
            return Err(EventError::InvalidPattern(format!(
                "{field}: unsupported operator '{name}'"
            )))
        }
    };

    if !valid {
        return Err(EventError::InvalidPattern(format!(
            "{field}: invalid argument for '{name}'"
        )));
    }
    Ok(())
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn match_object(pattern: &Map<String, Value>, event: &Value) -> bool {
    pattern.iter().all(|(key, expected)| {
        let actual = event.get(key);
        match expected {
            Value::Object(inner) => actual.is_some_and(|v| match_object(inner, v)),
            Value::Array(conditions) => match_field(conditions, actual),
            _ => false,
        }
    })
}

fn match_field(conditions: &[Value], actual: Option<&Value>) -> bool {
    conditions.iter().any(|condition| match actual {
        None => matches!(condition.get("exists"), Some(Value::Bool(false))),
        Some(Value::Array(values)) => values.iter().any(|v| match_condition(condition, v)),
        Some(value) => match_condition(condition, value),
    })
}

fn match_condition(condition: &Value, value: &Value) -> bool {
    let Value::Object(op) = condition else {
        return condition == value;
    };

    let Some((name, arg)) = op.iter().next() else {
        return false;
    };

    match name.as_str() {
        "prefix" => match (arg.as_str(), value.as_str()) {
            (Some(prefix), Some(s)) => s.starts_with(prefix),
            _ => false,
        },
        "exists" => arg.as_bool() == Some(true),
        "anything-but" => match arg {
            Value::Array(excluded) => !excluded.contains(value),
            excluded => excluded != value,
        },
        _ => false,
    }
}
