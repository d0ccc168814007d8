//! Step conditions - gate a step on an earlier step's output
//!
//! Parsed types only. Evaluation lives in `runtime::condition`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Optional gate on a step
///
/// ```yaml
/// condition:
///   source_step: step-readiness
///   field: score
///   operator: greater_than
///   value: 60
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCondition {
    pub source_step: String,
    /// Dot path into JSON output, or a label searched for in text output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub operator: ConditionOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Exists,
    NotExists,
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
}

/// Comparison operand (YAML numbers stay numeric)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Text(String),
}

impl ConditionValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl StepCondition {
    /// Human-readable description, used when reporting a skipped step
    pub fn describe(&self) -> String {
        let subject = match &self.field {
            Some(field) => format!("\"{}\"", field),
            None => "output".to_string(),
        };
        let value = self
            .value
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        match self.operator {
            ConditionOperator::Exists => format!("{} exists", subject),
            ConditionOperator::NotExists => format!("{} does not exist", subject),
            ConditionOperator::Equals => format!("{} equals \"{}\"", subject, value),
            ConditionOperator::NotEquals => format!("{} does not equal \"{}\"", subject, value),
            ConditionOperator::Contains => format!("{} contains \"{}\"", subject, value),
            ConditionOperator::NotContains => format!("{} does not contain \"{}\"", subject, value),
            ConditionOperator::GreaterThan => format!("{} > {}", subject, value),
            ConditionOperator::LessThan => format!("{} < {}", subject, value),
        }
    }
}
