//! Definition Validation - runs once, before a workflow is offered
//!
//! Validates:
//! - Workflow has at least one step
//! - Step ids, output keys and global input ids are unique
//! - `global` mappings name a declared global input
//! - `previous` mappings name an earlier step and its declared output key
//! - Condition sources name an earlier step
//!
//! Computed-template tokens that name nothing are warnings only: at run time
//! they interpolate to the empty string.
//!
//! Error codes:
//! - SKF-010: Empty workflow
//! - SKF-011..013: Duplicate step id / output key / global input
//! - SKF-014: Unknown global input
//! - SKF-015: Unknown source step
//! - SKF-016: Source step does not run before the reader
//! - SKF-017: Output key mismatch
//! - SKF-018: Condition source does not run before the step

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::ast::{InputMapping, WorkflowDefinition};
use crate::binding::extract_tokens;
use crate::error::SkillflowError;

/// Non-fatal findings from validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<DefinitionWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A computed-template token that will not resolve as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionWarning {
    pub step_id: String,
    pub param: String,
    pub token: String,
    pub message: String,
}

/// Validate a definition; the first error wins (fail-fast)
pub fn validate_definition(
    definition: &WorkflowDefinition,
) -> Result<ValidationReport, SkillflowError> {
    if definition.steps.is_empty() {
        return Err(SkillflowError::EmptyWorkflow {
            workflow_id: definition.id.clone(),
        });
    }

    let mut global_ids: FxHashSet<&str> = FxHashSet::default();
    for input in &definition.global_inputs {
        if !global_ids.insert(input.id.as_str()) {
            return Err(SkillflowError::DuplicateGlobalInput {
                input_id: input.id.clone(),
            });
        }
    }

    // step_id → index, output_key → (index, step_id)
    let mut step_index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut output_owner: FxHashMap<&str, (usize, &str)> = FxHashMap::default();
    for (idx, step) in definition.steps.iter().enumerate() {
        if step_index.insert(step.id.as_str(), idx).is_some() {
            return Err(SkillflowError::DuplicateStepId {
                step_id: step.id.clone(),
            });
        }
        if let Some((_, first)) = output_owner.insert(step.output_key.as_str(), (idx, step.id.as_str())) {
            return Err(SkillflowError::DuplicateOutputKey {
                output_key: step.output_key.clone(),
                first: first.to_string(),
                second: step.id.clone(),
            });
        }
    }

    let mut report = ValidationReport::default();

    for (idx, step) in definition.steps.iter().enumerate() {
        for (param, mapping) in &step.input_mappings {
            match mapping {
                InputMapping::Global { input_id } => {
                    if !global_ids.contains(input_id.as_str()) {
                        return Err(SkillflowError::UnknownGlobalInput {
                            step_id: step.id.clone(),
                            param: param.clone(),
                            input_id: input_id.clone(),
                        });
                    }
                }
                InputMapping::Previous {
                    step_id,
                    output_key,
                } => {
                    let source_idx = *step_index.get(step_id.as_str()).ok_or_else(|| {
                        SkillflowError::UnknownSourceStep {
                            step_id: step.id.clone(),
                            param: param.clone(),
                            source_step: step_id.clone(),
                        }
                    })?;
                    if source_idx >= idx {
                        return Err(SkillflowError::ForwardReference {
                            step_id: step.id.clone(),
                            param: param.clone(),
                            source_step: step_id.clone(),
                        });
                    }
                    let declared = &definition.steps[source_idx].output_key;
                    if declared != output_key {
                        return Err(SkillflowError::OutputKeyMismatch {
                            step_id: step.id.clone(),
                            param: param.clone(),
                            source_step: step_id.clone(),
                            expected: output_key.clone(),
                            actual: declared.clone(),
                        });
                    }
                }
                InputMapping::Computed { template } => {
                    for token in extract_tokens(template) {
                        if global_ids.contains(token) {
                            continue;
                        }
                        let message = match output_owner.get(token) {
                            Some((owner_idx, _)) if *owner_idx < idx => continue,
                            Some((_, owner)) => format!(
                                "'{{{{{}}}}}' is written by '{}', which runs later; it will be empty",
                                token, owner
                            ),
                            None => format!(
                                "'{{{{{}}}}}' names no global input or output; it will be empty",
                                token
                            ),
                        };
                        warn!(workflow = %definition.id, step = %step.id, %param, "{}", message);
                        report.warnings.push(DefinitionWarning {
                            step_id: step.id.clone(),
                            param: param.clone(),
                            token: token.to_string(),
                            message,
                        });
                    }
                }
                InputMapping::Static { .. } => {}
            }
        }

        if let Some(condition) = &step.condition {
            let precedes = step_index
                .get(condition.source_step.as_str())
                .is_some_and(|source_idx| *source_idx < idx);
            if !precedes {
                return Err(SkillflowError::InvalidConditionSource {
                    step_id: step.id.clone(),
                    source_step: condition.source_step.clone(),
                });
            }
        }
    }

    Ok(report)
}
