//! Condition Evaluation - decide whether a gated step runs
//!
//! Field extraction order:
//! 1. No field: the whole output
//! 2. Output parses as JSON: follow the dot path (`risk.level`, `items.0`)
//! 3. Text patterns, case-insensitive: `field: 75`, `field: "v"`, `field: 'v'`,
//!    `field: v`, `**field**: 75`
//! 4. Field name appears anywhere: `true`
//!
//! String comparisons ignore case. Numeric comparisons are false unless both
//! sides parse as numbers.

use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::ast::{ConditionOperator, ConditionValue, StepCondition};
use crate::binding::ExecutionScope;

/// Value pulled out of a step output
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    fn is_present(&self) -> bool {
        match self {
            Self::Missing => false,
            Self::Text(s) => !s.is_empty(),
            Self::Bool(_) | Self::Number(_) => true,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) | Self::Missing => None,
        }
    }

    fn from_capture(raw: &str) -> Self {
        raw.parse::<f64>()
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Text(raw.to_string()))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Extract `field` from a step output
pub fn extract_field(output: &str, field: Option<&str>) -> FieldValue {
    let Some(path) = field else {
        return FieldValue::Text(output.to_string());
    };

    match serde_json::from_str::<Value>(output) {
        Ok(json) => extract_json_path(&json, path),
        Err(_) => extract_from_text(output, path),
    }
}

fn extract_json_path(root: &Value, path: &str) -> FieldValue {
    let mut current = root;
    for part in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return FieldValue::Missing,
        }
    }

    match current {
        Value::Null => FieldValue::Missing,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(FieldValue::Missing, FieldValue::Number),
        Value::String(s) => FieldValue::Text(s.clone()),
        other => FieldValue::Text(other.to_string()),
    }
}

fn extract_from_text(output: &str, field: &str) -> FieldValue {
    let name = regex::escape(field);
    let patterns = [
        format!(r"(?i){}[:\s]+([\d.]+)", name),
        format!(r#"(?i){}[:\s]+"([^"]+)""#, name),
        format!(r"(?i){}[:\s]+'([^']+)'", name),
        format!(r"(?i){}[:\s]+([^\s,]+)", name),
        format!(r"(?i)\*\*{}\*\*[:\s]+([\d.]+)", name),
    ];

    let captured = patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .find_map(|re| {
            re.captures(output)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        });

    if let Some(raw) = captured {
        return FieldValue::from_capture(&raw);
    }

    if output.to_lowercase().contains(&field.to_lowercase()) {
        FieldValue::Bool(true)
    } else {
        FieldValue::Missing
    }
}

/// Evaluate a condition against the outputs recorded so far
///
/// A source step without output (skipped, or not yet run) makes the condition false.
pub fn evaluate_condition(condition: &StepCondition, scope: &ExecutionScope) -> bool {
    let Some(output) = scope.output_of(&condition.source_step) else {
        return false;
    };

    let extracted = extract_field(output, condition.field.as_deref());
    compare(&extracted, condition.operator, condition.value.as_ref())
}

fn compare(extracted: &FieldValue, operator: ConditionOperator, expected: Option<&ConditionValue>) -> bool {
    let expected_text = || {
        expected
            .map(|v| v.to_string().to_lowercase())
            .unwrap_or_default()
    };
    let actual_text = || extracted.to_string().to_lowercase();

    match operator {
        ConditionOperator::Exists => extracted.is_present(),
        ConditionOperator::NotExists => !extracted.is_present(),
        ConditionOperator::Equals => equals(extracted, expected, actual_text(), expected_text()),
        ConditionOperator::NotEquals => !equals(extracted, expected, actual_text(), expected_text()),
        ConditionOperator::Contains => actual_text().contains(&expected_text()),
        ConditionOperator::NotContains => !actual_text().contains(&expected_text()),
        ConditionOperator::GreaterThan => numeric(extracted, expected).is_some_and(|(a, b)| a > b),
        ConditionOperator::LessThan => numeric(extracted, expected).is_some_and(|(a, b)| a < b),
    }
}

fn equals(
    extracted: &FieldValue,
    expected: Option<&ConditionValue>,
    actual_text: String,
    expected_text: String,
) -> bool {
    match (extracted, expected) {
        (FieldValue::Number(a), Some(ConditionValue::Number(b))) => a == b,
        _ => actual_text == expected_text,
    }
}

fn numeric(extracted: &FieldValue, expected: Option<&ConditionValue>) -> Option<(f64, f64)> {
    Some((extracted.as_f64()?, expected?.as_f64()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Payload, StepDefinition};

    fn scope_with(output: &str) -> ExecutionScope {
        let step = StepDefinition {
            id: "src".into(),
            skill_id: "skill".into(),
            name: "Source".into(),
            description: None,
            output_key: "analysis".into(),
            input_mappings: Default::default(),
            condition: None,
        };
        let mut scope = ExecutionScope::new(Payload::new());
        scope.record_output(&step, output.into());
        scope
    }

    fn cond(field: Option<&str>, operator: ConditionOperator, value: Option<ConditionValue>) -> StepCondition {
        StepCondition {
            source_step: "src".into(),
            field: field.map(String::from),
            operator,
            value,
        }
    }

    #[test]
    fn json_dot_path() {
        let out = r#"{"risk": {"level": "High"}, "score": 72}"#;
        assert_eq!(extract_field(out, Some("risk.level")), FieldValue::Text("High".into()));
        assert_eq!(extract_field(out, Some("score")), FieldValue::Number(72.0));
        assert_eq!(extract_field(out, Some("risk.missing")), FieldValue::Missing);
    }

    #[test]
    fn text_patterns() {
        assert_eq!(extract_field("Score: 75 overall", Some("score")), FieldValue::Number(75.0));
        assert_eq!(
            extract_field(r#"verdict: "strong hire""#, Some("verdict")),
            FieldValue::Text("strong hire".into())
        );
        assert_eq!(extract_field("level: high, next", Some("level")), FieldValue::Text("high".into()));
        assert_eq!(extract_field("**Fit**: 8.5", Some("fit")), FieldValue::Number(8.5));
    }

    #[test]
    fn bare_presence_and_absence() {
        assert_eq!(extract_field("mentions the salary.", Some("salary")), FieldValue::Bool(true));
        assert_eq!(extract_field("nothing here", Some("salary")), FieldValue::Missing);
    }

    #[test]
    fn numeric_comparisons() {
        let scope = scope_with("Readiness score: 72");
        let gt = cond(Some("score"), ConditionOperator::GreaterThan, Some(ConditionValue::Number(60.0)));
        let lt = cond(Some("score"), ConditionOperator::LessThan, Some(ConditionValue::Number(60.0)));
        assert!(evaluate_condition(&gt, &scope));
        assert!(!evaluate_condition(&lt, &scope));

        let text = scope_with(r#"{"score": "n/a"}"#);
        assert!(!evaluate_condition(&gt, &text));
        assert!(!evaluate_condition(&lt, &text));
    }

    #[test]
    fn string_comparisons_ignore_case() {
        let scope = scope_with(r#"{"decision": "Offer"}"#);
        let eq = cond(
            Some("decision"),
            ConditionOperator::Equals,
            Some(ConditionValue::Text("offer".into())),
        );
        assert!(evaluate_condition(&eq, &scope));

        let contains = cond(None, ConditionOperator::Contains, Some(ConditionValue::Text("OFFER".into())));
        assert!(evaluate_condition(&contains, &scope));

        let not_contains = cond(
            None,
            ConditionOperator::NotContains,
            Some(ConditionValue::Text("reject".into())),
        );
        assert!(evaluate_condition(&not_contains, &scope));
    }

    #[test]
    fn exists_operators() {
        let scope = scope_with("");
        assert!(!evaluate_condition(&cond(None, ConditionOperator::Exists, None), &scope));
        assert!(evaluate_condition(&cond(None, ConditionOperator::NotExists, None), &scope));
    }

    #[test]
    fn missing_source_output_is_false() {
        let scope = ExecutionScope::new(Payload::new());
        assert!(!evaluate_condition(&cond(None, ConditionOperator::NotExists, None), &scope));
    }
}
