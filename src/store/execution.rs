//! WorkflowExecution - the record of one run
//!
//! Built up by the step executor and handed back to the caller (or stored
//! on a batch item). Never shared between runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ast::{Payload, WorkflowDefinition};

/// Per-step state within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Completed,
    Error,
    Skipped,
}

/// Terminal status of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed { step_id: String, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowExecution {
    pub workflow_id: String,
    /// The global values this run started with
    pub global_inputs: Payload,
    /// output_key → output text
    pub step_outputs: Payload,
    /// step_id → status
    pub step_statuses: BTreeMap<String, StepStatus>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl WorkflowExecution {
    /// Every step starts out pending
    pub(crate) fn pending_statuses(definition: &WorkflowDefinition) -> BTreeMap<String, StepStatus> {
        definition
            .steps
            .iter()
            .map(|s| (s.id.clone(), StepStatus::Pending))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded)
    }

    /// Id of the step that failed the run
    pub fn failed_step(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Failed { step_id, .. } => Some(step_id),
            RunStatus::Succeeded => None,
        }
    }

    /// Failure reason, if the run failed
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Failed { reason, .. } => Some(reason),
            RunStatus::Succeeded => None,
        }
    }

    pub fn output(&self, output_key: &str) -> Option<&str> {
        self.step_outputs.get(output_key).map(String::as_str)
    }

    pub fn step_status(&self, step_id: &str) -> Option<StepStatus> {
        self.step_statuses.get(step_id).copied()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}
