//! BatchExecution - state of one batch of runs
//!
//! A batch owns its items; each item owns the run record it produced.
//! Item order is submission order and never changes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::ast::{Payload, WorkflowDefinition};

use super::execution::WorkflowExecution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Aggregate batch status
///
/// `Error` means batch setup failed; failed items leave the batch `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Error,
    Cancelled,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One input set and what became of it
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub id: String,
    pub inputs: Payload,
    pub status: ItemStatus,
    pub result: Option<WorkflowExecution>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchItem {
    pub fn new(index: usize, inputs: Payload) -> Self {
        Self {
            id: format!("item-{}", index + 1),
            inputs,
            status: ItemStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Counts recomputed from item statuses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchProgress {
    /// Items that reached a terminal state
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_items: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub running: usize,
    /// Percent of all items that completed
    pub success_rate: f64,
    /// Mean duration of completed items with both timestamps
    pub avg_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchExecution {
    pub id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    pub items: Vec<BatchItem>,
    pub concurrency: usize,
    pub status: BatchStatus,
    /// Batch setup failure
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchExecution {
    /// A pending batch with one pending item per input set
    pub fn new(definition: &WorkflowDefinition, input_sets: Vec<Payload>, concurrency: usize) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("batch-{}-{}", definition.id, &suffix[..8]),
            workflow_id: definition.id.clone(),
            workflow_name: definition.name.clone(),
            items: input_sets
                .into_iter()
                .enumerate()
                .map(|(i, inputs)| BatchItem::new(i, inputs))
                .collect(),
            concurrency,
            status: BatchStatus::Pending,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn progress(&self) -> BatchProgress {
        let mut progress = BatchProgress {
            total: self.items.len(),
            ..Default::default()
        };
        for item in &self.items {
            match item.status {
                ItemStatus::Pending => progress.pending += 1,
                ItemStatus::Running => progress.running += 1,
                ItemStatus::Completed => progress.completed += 1,
                ItemStatus::Error => progress.failed += 1,
            }
        }
        progress
    }

    pub fn summary(&self) -> BatchSummary {
        let progress = self.progress();
        let durations: Vec<i64> = self
            .items
            .iter()
            .filter(|i| i.status == ItemStatus::Completed)
            .filter_map(BatchItem::duration_ms)
            .collect();

        BatchSummary {
            total_items: progress.total,
            completed: progress.completed,
            failed: progress.failed,
            pending: progress.pending,
            running: progress.running,
            success_rate: if progress.total > 0 {
                progress.completed as f64 / progress.total as f64 * 100.0
            } else {
                0.0
            },
            avg_duration_ms: if durations.is_empty() {
                0.0
            } else {
                durations.iter().sum::<i64>() as f64 / durations.len() as f64
            },
        }
    }
}
