//! Schedule expressions: `cron(...)` and `rate(...)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::EventError;

/// Unit of a rate expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateUnit {
    Minute,
    Hour,
    Day,
}

impl RateUnit {
    fn label(&self, value: u32) -> &'static str {
        match (self, value == 1) {
            (RateUnit::Minute, true) => "minute",
            (RateUnit::Minute, false) => "minutes",
            (RateUnit::Hour, true) => "hour",
            (RateUnit::Hour, false) => "hours",
            (RateUnit::Day, true) => "day",
            (RateUnit::Day, false) => "days",
        }
    }

    /// Parse a unit label, returning the unit and whether it was plural.
    fn parse(label: &str) -> Option<(Self, bool)> {
        match label {
            "minute" => Some((RateUnit::Minute, false)),
            "minutes" => Some((RateUnit::Minute, true)),
            "hour" => Some((RateUnit::Hour, false)),
            "hours" => Some((RateUnit::Hour, true)),
            "day" => Some((RateUnit::Day, false)),
            "days" => Some((RateUnit::Day, true)),
            _ => None,
        }
    }

    pub fn seconds(&self) -> u64 {
        match self {
            RateUnit::Minute => 60,
            RateUnit::Hour => 3_600,
            RateUnit::Day => 86_400,
        }
    }
}

/// Six-field cron expression:
/// minutes, hours, day-of-month, month, day-of-week, year.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CronExpression {
    fields: [String; 6],
}

impl CronExpression {
    const ALLOWED: &'static [char] = &['*', '?', ',', '-', '/', 'L', 'W', '#'];

    fn parse(expression: &str, body: &str) -> Result<Self, EventError> {
        let parts: Vec<&str> = body.split_whitespace().collect();
        let fields: [String; 6] = match parts.as_slice() {
            [a, b, c, d, e, f] => [a, b, c, d, e, f].map(|s| s.to_string()),
            _ => {
                return Err(EventError::schedule(
                    expression,
                    format!("cron takes 6 fields, found {}", parts.len()),
                ))
            }
        };

        for field in &fields {
            if let Some(c) = field
                .chars()
                .find(|c| !c.is_ascii_alphanumeric() && !Self::ALLOWED.contains(c))
            {
                return Err(EventError::schedule(
                    expression,
                    format!("invalid character '{c}' in field '{field}'"),
                ));
            }
        }

        let dom_any = fields[2] == "?";
        let dow_any = fields[4] == "?";
        if dom_any == dow_any {
            return Err(EventError::schedule(
                expression,
                "exactly one of day-of-month and day-of-week must be '?'",
            ));
        }

        Ok(Self { fields })
    }

    pub fn minutes(&self) -> &str {
        &self.fields[0]
    }

    pub fn hours(&self) -> &str {
        &self.fields[1]
    }

    pub fn day_of_month(&self) -> &str {
        &self.fields[2]
    }

    pub fn month(&self) -> &str {
        &self.fields[3]
    }

    pub fn day_of_week(&self) -> &str {
        &self.fields[4]
    }

    pub fn year(&self) -> &str {
        &self.fields[5]
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join(" "))
    }
}

/// When a scheduled trigger fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleExpression {
    Cron(CronExpression),
    Rate { value: u32, unit: RateUnit },
}

impl ScheduleExpression {
    pub fn parse(expression: &str) -> Result<Self, EventError> {
        let trimmed = expression.trim();

        if let Some(body) = trimmed
            .strip_prefix("cron(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return CronExpression::parse(expression, body).map(ScheduleExpression::Cron);
        }

        if let Some(body) = trimmed
            .strip_prefix("rate(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_rate(expression, body);
        }

        Err(EventError::schedule(
            expression,
            "expected cron(...) or rate(...)",
        ))
    }

    /// A rate expression. `value` must be at least 1.
    pub fn rate(value: u32, unit: RateUnit) -> Result<Self, EventError> {
        if value == 0 {
            return Err(EventError::schedule(
                &format!("rate(0 {})", unit.label(0)),
                "rate value must be at least 1",
            ));
        }
        Ok(ScheduleExpression::Rate { value, unit })
    }

    fn parse_rate(expression: &str, body: &str) -> Result<Self, EventError> {
        let mut parts = body.split_whitespace();
        let (Some(value), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EventError::schedule(expression, "rate takes a value and a unit"));
        };

        let value: u32 = value
            .parse()
            .map_err(|_| EventError::schedule(expression, format!("invalid rate value '{value}'")))?;
        if value == 0 {
            return Err(EventError::schedule(expression, "rate value must be at least 1"));
        }

        let Some((unit, plural)) = RateUnit::parse(unit) else {
            return Err(EventError::schedule(expression, format!("unknown rate unit '{unit}'")));
        };
        if plural == (value == 1) {
            return Err(EventError::schedule(
                expression,
                "unit must be singular for a value of 1 and plural otherwise",
            ));
        }

        Ok(ScheduleExpression::Rate { value, unit })
    }

    /// Interval between firings, for rate expressions.
    pub fn interval_seconds(&self) -> Option<u64> {
        match self {
            ScheduleExpression::Rate { value, unit } => Some(u64::from(*value) * unit.seconds()),
            ScheduleExpression::Cron(_) => None,
        }
    }
}

impl fmt::Display for ScheduleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleExpression::Cron(cron) => write!(f, "cron({cron})"),
            ScheduleExpression::Rate { value, unit } => {
                write!(f, "rate({value} {})", unit.label(*value))
            }
        }
    }
}

impl FromStr for ScheduleExpression {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ScheduleExpression {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScheduleExpression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
