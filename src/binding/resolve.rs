//! Payload Resolution - turn a step's input mappings into a concrete payload
//!
//! `ExecutionScope` is the per-run state: the global input values plus the
//! outputs produced so far. Each run (and each batch item) owns its own scope.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::ast::{InputMapping, Payload, StepDefinition};
use crate::error::SkillflowError;

use super::template::{interpolate, ValueScope};

/// Values visible to a step while a run is in progress
#[derive(Debug, Clone, Default)]
pub struct ExecutionScope {
    globals: Payload,
    /// output_key → output text
    outputs: Payload,
    /// step_id → output_key it wrote
    producers: FxHashMap<String, String>,
    /// Steps whose condition was false
    skipped: FxHashSet<String>,
}

impl ExecutionScope {
    pub fn new(globals: Payload) -> Self {
        Self {
            globals,
            ..Default::default()
        }
    }

    pub fn globals(&self) -> &Payload {
        &self.globals
    }

    pub fn outputs(&self) -> &Payload {
        &self.outputs
    }

    /// Store a step's output under its output key
    pub fn record_output(&mut self, step: &StepDefinition, output: String) {
        self.producers
            .insert(step.id.clone(), step.output_key.clone());
        self.outputs.insert(step.output_key.clone(), output);
    }

    pub fn record_skip(&mut self, step_id: &str) {
        self.skipped.insert(step_id.to_string());
    }

    pub fn is_skipped(&self, step_id: &str) -> bool {
        self.skipped.contains(step_id)
    }

    /// Output a given step wrote under `output_key`
    pub fn step_output(&self, step_id: &str, output_key: &str) -> Option<&str> {
        match self.producers.get(step_id) {
            Some(key) if key == output_key => self.outputs.get(key).map(String::as_str),
            _ => None,
        }
    }

    /// Output of a step under whatever key it declared
    pub fn output_of(&self, step_id: &str) -> Option<&str> {
        self.producers
            .get(step_id)
            .and_then(|key| self.outputs.get(key))
            .map(String::as_str)
    }

    pub fn into_outputs(self) -> Payload {
        self.outputs
    }
}

/// Merged view for computed templates: global values win on collision
impl ValueScope for ExecutionScope {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.globals
            .get(name)
            .or_else(|| self.outputs.get(name))
            .map(String::as_str)
    }
}

/// Build the payload for one step
///
/// - `Global`: the run's value, or "" when absent (required inputs are checked at run start)
/// - `Previous`: the earlier step's output; absent output is a definition bug and fails loudly
/// - `Computed`: template interpolated against globals then outputs (misses become "")
/// - `Static`: the literal value
pub fn resolve_payload(
    step: &StepDefinition,
    scope: &ExecutionScope,
) -> Result<Payload, SkillflowError> {
    let mut payload = Payload::new();

    for (param, mapping) in &step.input_mappings {
        let value = match mapping {
            InputMapping::Global { input_id } => {
                scope.globals().get(input_id).cloned().unwrap_or_default()
            }
            InputMapping::Previous {
                step_id,
                output_key,
            } => match scope.step_output(step_id, output_key) {
                Some(output) => output.to_string(),
                None if scope.is_skipped(step_id) => {
                    debug!(step = %step.id, source = %step_id, "source step skipped, using empty value");
                    String::new()
                }
                None => {
                    return Err(SkillflowError::MappingResolution {
                        step_id: step.id.clone(),
                        param: param.clone(),
                        source_step: step_id.clone(),
                    })
                }
            },
            InputMapping::Computed { template } => interpolate(template, scope).into_owned(),
            InputMapping::Static { value } => value.clone(),
        };
        payload.insert(param.clone(), value);
    }

    Ok(payload)
}
