//! Workflow Types - immutable pipeline definitions
//!
//! Contains the YAML-parsed types:
//! - `WorkflowDefinition`: Root definition with global inputs and ordered steps
//! - `GlobalInputField`: A value collected once per run
//! - `StepDefinition`: One skill invocation and how its payload is built
//! - `InputMapping`: Where a single payload parameter comes from

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SkillflowError;

use super::condition::StepCondition;

/// Expected schema version for workflow files
pub const SCHEMA_V01: &str = "skillflow/workflow@0.1";

/// A concrete parameter payload handed to the skill invoker
pub type Payload = BTreeMap<String, String>;

/// Workflow loaded from the catalog (never mutated after validation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub schema: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub global_inputs: Vec<GlobalInputField>,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// Validate the schema version string
    pub fn validate_schema(&self) -> Result<(), SkillflowError> {
        if self.schema != SCHEMA_V01 {
            return Err(SkillflowError::ParseError {
                details: format!(
                    "workflow '{}': expected schema '{}', got '{}'",
                    self.id, SCHEMA_V01, self.schema
                ),
            });
        }
        Ok(())
    }

    /// Parse a definition from YAML (schema checked, not yet validated)
    pub fn from_yaml(yaml: &str) -> Result<Self, SkillflowError> {
        let definition: Self =
            serde_yaml::from_str(yaml).map_err(|e| SkillflowError::ParseError {
                details: e.to_string(),
            })?;
        definition.validate_schema()?;
        Ok(definition)
    }

    /// Position of a step in declared order
    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn global_input(&self, input_id: &str) -> Option<&GlobalInputField> {
        self.global_inputs.iter().find(|i| i.id == input_id)
    }
}

/// Kind of form control a global input is collected with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Text,
    Textarea,
    Select,
}

/// A user-supplied value available to every step in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalInputField {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    /// Enumerated values; empty means free text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

/// One step of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    pub skill_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub output_key: String,
    #[serde(default)]
    pub input_mappings: BTreeMap<String, InputMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<StepCondition>,
}

/// Where one payload parameter comes from
///
/// ```yaml
/// input_mappings:
///   jobTitle: { type: global, input_id: jobTitle }
///   resume: { type: previous, step_id: step-customize, output_key: customizedResume }
///   context: { type: computed, template: "Interview: {{interviewType}}" }
///   tone: { type: static, value: formal }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputMapping {
    Global { input_id: String },
    Previous { step_id: String, output_key: String },
    Computed { template: String },
    Static { value: String },
}

impl InputMapping {
    /// Step this mapping reads from, if any
    pub fn source_step(&self) -> Option<&str> {
        match self {
            Self::Previous { step_id, .. } => Some(step_id),
            Self::Global { .. } | Self::Computed { .. } | Self::Static { .. } => None,
        }
    }
}
