//! Runtime Module - workflow execution
//!
//! Contains the runtime execution components:
//! - `executor`: one sequential, fail-fast run (`StepExecutor`)
//! - `batch`: many runs under a concurrency cap (`BatchScheduler`)
//! - `condition`: step condition evaluation
//! - `observer`: batch progress callbacks
//!
//! This module represents the "how" - runtime execution.
//! For static structure, see the `ast` module.

mod batch;
mod condition;
mod executor;
mod observer;

pub use batch::{BatchHandle, BatchOptions, BatchScheduler};
pub use condition::{evaluate_condition, extract_field, FieldValue};
pub use executor::{validate_run_inputs, StepExecutor};
pub use observer::{BatchObserver, NoopObserver};
