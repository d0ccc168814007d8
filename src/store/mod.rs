//! Store Module - run and batch state
//!
//! Key types:
//! - `WorkflowExecution`: record of one run (outputs, per-step status)
//! - `BatchExecution`: items, aggregate status, progress and summary
//! - `BatchItem`: one input set and its run record

mod batch;
mod execution;

pub use batch::{BatchExecution, BatchItem, BatchProgress, BatchStatus, BatchSummary, ItemStatus};
pub use execution::{RunStatus, StepStatus, WorkflowExecution};
