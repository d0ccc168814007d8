//! Step Executor - one sequential, fail-fast run of a workflow
//!
//! State machine per run: `NotStarted → Running(step) → Succeeded | Failed(step)`.
//!
//! Steps run strictly in declared order. The first step that fails (payload
//! resolution or skill call) ends the run; later steps are never invoked.
//! A step whose condition is false is skipped and the run continues.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::ast::{Payload, WorkflowDefinition};
use crate::binding::{resolve_payload, ExecutionScope};
use crate::error::{Result, SkillflowError};
use crate::invoker::SkillInvoker;
use crate::store::{RunStatus, StepStatus, WorkflowExecution};

use super::condition::evaluate_condition;

/// Runs workflows against one skill invoker
#[derive(Clone)]
pub struct StepExecutor {
    invoker: Arc<dyn SkillInvoker>,
}

impl StepExecutor {
    pub fn new(invoker: Arc<dyn SkillInvoker>) -> Self {
        Self { invoker }
    }

    pub fn invoker_name(&self) -> &str {
        self.invoker.name()
    }

    /// Run every step of `definition` with `globals`
    ///
    /// Returns `Err` only when the inputs are rejected before any step runs.
    /// Step failures come back as `RunStatus::Failed` on the execution.
    #[instrument(skip(self, definition, globals), fields(workflow = %definition.id, steps = definition.steps.len()))]
    pub async fn run_workflow(
        &self,
        definition: &WorkflowDefinition,
        globals: Payload,
    ) -> Result<WorkflowExecution> {
        validate_run_inputs(definition, &globals)?;

        let run_start = Instant::now();
        let started_at = Utc::now();
        info!("Starting workflow run");

        let mut scope = ExecutionScope::new(globals.clone());
        let mut step_statuses = WorkflowExecution::pending_statuses(definition);
        let mut status = RunStatus::Succeeded;

        for step in &definition.steps {
            if let Some(condition) = &step.condition {
                if !evaluate_condition(condition, &scope) {
                    info!(step = %step.id, "Skipping step: condition not met ({})", condition.describe());
                    scope.record_skip(&step.id);
                    step_statuses.insert(step.id.clone(), StepStatus::Skipped);
                    continue;
                }
            }

            let result = match resolve_payload(step, &scope) {
                Ok(payload) => {
                    debug!(step = %step.id, skill = %step.skill_id, params = payload.len(), "invoking skill");
                    self.invoker
                        .invoke(&step.skill_id, &payload)
                        .await
                        .map_err(|e| SkillflowError::StepExecution {
                            step_id: step.id.clone(),
                            skill_id: step.skill_id.clone(),
                            reason: format!("{:#}", e),
                        })
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(output) => {
                    debug!(step = %step.id, output_len = output.len(), "step completed");
                    scope.record_output(step, output);
                    step_statuses.insert(step.id.clone(), StepStatus::Completed);
                }
                Err(e) => {
                    warn!(step = %step.id, error = %e, "Step failed, stopping run");
                    step_statuses.insert(step.id.clone(), StepStatus::Error);
                    status = RunStatus::Failed {
                        step_id: step.id.clone(),
                        reason: e.to_string(),
                    };
                    break;
                }
            }
        }

        info!(
            success = matches!(status, RunStatus::Succeeded),
            duration_ms = run_start.elapsed().as_millis() as u64,
            "Workflow run finished"
        );

        Ok(WorkflowExecution {
            workflow_id: definition.id.clone(),
            global_inputs: globals,
            step_outputs: scope.into_outputs(),
            step_statuses,
            status,
            started_at,
            completed_at: Utc::now(),
        })
    }
}

/// Run-start checks on the global values
///
/// - required fields must be present and non-blank
/// - fields with options must hold one of them (when non-empty)
pub fn validate_run_inputs(definition: &WorkflowDefinition, globals: &Payload) -> Result<()> {
    for field in &definition.global_inputs {
        let value = globals.get(&field.id).map(|v| v.trim()).unwrap_or("");

        if value.is_empty() {
            if field.required {
                return Err(SkillflowError::MissingRequiredInput {
                    input_id: field.id.clone(),
                    label: field.label.clone(),
                });
            }
            continue;
        }

        if !field.options.is_empty() && !field.options.iter().any(|o| o == value) {
            return Err(SkillflowError::InvalidOption {
                input_id: field.id.clone(),
                label: field.label.clone(),
                value: value.to_string(),
                options: field.options.join(", "),
            });
        }
    }
    Ok(())
}
