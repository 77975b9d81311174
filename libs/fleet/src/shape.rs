//! Instance shapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::FleetError;

/// A requested instance shape, e.g. `m5.large`.
///
/// Strings of the form `family.size` are split; anything without a `.` is kept
/// as a raw shape string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstanceShape {
    Sized { family: String, size: String },
    Raw(String),
}

impl InstanceShape {
    pub fn parse(s: &str) -> Result<Self, FleetError> {
        let invalid = |reason: &str| FleetError::InvalidShape {
            shape: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("cannot be empty"));
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(invalid("only letters, digits, '.' and '-' are allowed"));
        }

        match s.split_once('.') {
            None => Ok(InstanceShape::Raw(s.to_string())),
            Some((family, size)) => {
                if family.is_empty() || size.is_empty() || size.contains('.') {
                    return Err(invalid("expected 'family.size'"));
                }
                Ok(InstanceShape::Sized {
                    family: family.to_string(),
                    size: size.to_string(),
                })
            }
        }
    }

    pub fn of(family: &str, size: &str) -> Result<Self, FleetError> {
        Self::parse(&format!("{family}.{size}"))
    }

    pub fn family(&self) -> Option<&str> {
        match self {
            InstanceShape::Sized { family, .. } => Some(family),
            InstanceShape::Raw(_) => None,
        }
    }

    pub fn size(&self) -> Option<&str> {
        match self {
            InstanceShape::Sized { size, .. } => Some(size),
            InstanceShape::Raw(_) => None,
        }
    }
}

impl fmt::Display for InstanceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceShape::Sized { family, size } => write!(f, "{family}.{size}"),
            InstanceShape::Raw(raw) => f.write_str(raw),
        }
    }
}

impl FromStr for InstanceShape {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for InstanceShape {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InstanceShape {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_sized() {
        let shape = InstanceShape::parse("m5.large").unwrap();
        assert_eq!(shape.family(), Some("m5"));
        assert_eq!(shape.size(), Some("large"));
        assert_eq!(shape.to_string(), "m5.large");
        assert_eq!(InstanceShape::of("m5", "large").unwrap(), shape);
    }

    #[test]
    fn test_parse_raw() {
        let shape = InstanceShape::parse("custom-shape").unwrap();
        assert_eq!(shape, InstanceShape::Raw("custom-shape".to_string()));
        assert_eq!(shape.family(), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", ".large", "m5.", "m5.large.x", "m5 large", "m5.la$ge"] {
            assert!(
                matches!(InstanceShape::parse(bad), Err(FleetError::InvalidShape { .. })),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_serde_as_string() {
        let shape = InstanceShape::parse("c6g.2xlarge").unwrap();
        let json = serde_json::to_string(&shape).unwrap();
        assert_eq!(json, "\"c6g.2xlarge\"");
        assert_eq!(serde_json::from_str::<InstanceShape>(&json).unwrap(), shape);
        assert!(serde_json::from_str::<InstanceShape>("\"\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_display_roundtrips(family in "[a-z][a-z0-9]{0,5}", size in "[a-z0-9]{1,8}") {
            let input = format!("{family}.{size}");
            let shape = InstanceShape::parse(&input).unwrap();
            prop_assert_eq!(shape.to_string(), input);
        }
    }
}
