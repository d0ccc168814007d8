//! Batch Scheduler - one workflow run per input set, bounded concurrency
//!
//! Admission loop:
//! 1. Wait while paused
//! 2. Wait until `delay_ms` has passed since the previous admission
//! 3. Wait for a free slot (semaphore permit)
//! 4. Mark the item `running` and spawn its run
//!
//! Each item gets its own run and scope; only the definition is shared.
//! A failed item never stops its siblings. Cancel stops admissions at once
//! and lets in-flight items finish.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::ast::{Payload, WorkflowDefinition};
use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_DELAY_MS};
use crate::error::SkillflowError;
use crate::store::{BatchExecution, BatchItem, BatchStatus, ItemStatus};

use super::executor::StepExecutor;
use super::observer::BatchObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum items running at once (must be at least 1)
    pub concurrency: usize,
    /// Minimum spacing between admissions
    pub delay_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

/// Pause, resume and cancel a running batch from anywhere
#[derive(Debug, Clone)]
pub struct BatchHandle {
    cancel: CancellationToken,
    paused: Arc<watch::Sender<bool>>,
}

impl Default for BatchHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchHandle {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            cancel: CancellationToken::new(),
            paused: Arc::new(paused),
        }
    }

    /// Stop admitting items; in-flight items finish
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Stop admitting items for good; in-flight items finish
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

type SharedBatch = Arc<Mutex<BatchExecution>>;

pub struct BatchScheduler {
    executor: StepExecutor,
    options: BatchOptions,
}

impl BatchScheduler {
    pub fn new(executor: StepExecutor, options: BatchOptions) -> Self {
        Self { executor, options }
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Run `definition` once per input set
    ///
    /// Always returns the batch: setup failures show up as `BatchStatus::Error`
    /// with `error` set, item failures on the items themselves.
    #[instrument(skip_all, fields(workflow = %definition.id, items = input_sets.len(), concurrency = self.options.concurrency))]
    pub async fn run(
        &self,
        definition: Arc<WorkflowDefinition>,
        input_sets: Vec<Payload>,
        observer: Arc<dyn BatchObserver>,
        handle: BatchHandle,
    ) -> BatchExecution {
        let mut batch = BatchExecution::new(&definition, input_sets, self.options.concurrency);

        if self.options.concurrency == 0 {
            let err = SkillflowError::InvalidConcurrency;
            error!(error = %err, "Batch setup failed");
            batch.status = BatchStatus::Error;
            batch.error = Some(err.to_string());
            observer.on_batch_status(BatchStatus::Error);
            return batch;
        }

        batch.status = BatchStatus::Running;
        batch.started_at = Some(Utc::now());
        let total = batch.items.len();
        info!(batch = %batch.id, "Starting batch");

        let state: SharedBatch = Arc::new(Mutex::new(batch));
        observer.on_batch_status(BatchStatus::Running);

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let delay = Duration::from_millis(self.options.delay_ms);
        let mut last_admission: Option<Instant> = None;
        let mut workers = JoinSet::new();

        'admission: for index in 0..total {
            let permit = loop {
                if !wait_while_paused(&handle, &state, observer.as_ref()).await {
                    break 'admission;
                }

                if let Some(last) = last_admission {
                    tokio::select! {
                        _ = handle.cancel.cancelled() => break 'admission,
                        _ = tokio::time::sleep_until(last + delay) => {}
                    }
                }

                let permit = tokio::select! {
                    _ = handle.cancel.cancelled() => break 'admission,
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break 'admission,
                    },
                };

                // Paused while waiting for a slot: give it back and wait again
                if handle.is_paused() {
                    drop(permit);
                    continue;
                }
                break permit;
            };

            if handle.is_cancelled() {
                break;
            }

            last_admission = Some(Instant::now());
            let (admitted, progress, inputs) = {
                let mut batch = state.lock();
                let item = &mut batch.items[index];
                item.status = ItemStatus::Running;
                item.started_at = Some(Utc::now());
                let admitted = item.clone();
                let inputs = item.inputs.clone();
                (admitted, batch.progress(), inputs)
            };
            debug!(item = %admitted.id, "Admitted batch item");
            observer.on_item_start(&admitted);
            observer.on_progress(progress);

            let executor = self.executor.clone();
            let definition = Arc::clone(&definition);
            let state = Arc::clone(&state);
            let observer = Arc::clone(&observer);

            workers.spawn(async move {
                // Slot is released only after the item's callbacks have fired
                let _permit = permit;

                let outcome = AssertUnwindSafe(executor.run_workflow(&definition, inputs))
                    .catch_unwind()
                    .await;

                let (finished, progress) = {
                    let mut batch = state.lock();
                    let item = &mut batch.items[index];
                    item.completed_at = Some(Utc::now());
                    match outcome {
                        Ok(Ok(run)) => {
                            if run.is_success() {
                                item.status = ItemStatus::Completed;
                            } else {
                                item.status = ItemStatus::Error;
                                item.error = run.error().map(String::from);
                            }
                            item.result = Some(run);
                        }
                        Ok(Err(e)) => {
                            item.status = ItemStatus::Error;
                            item.error = Some(e.to_string());
                        }
                        Err(_) => {
                            item.status = ItemStatus::Error;
                            item.error = Some("item run panicked".to_string());
                        }
                    }
                    let finished = item.clone();
                    (finished, batch.progress())
                };

                finish_item(observer.as_ref(), &finished);
                observer.on_progress(progress);
            });
        }

        if handle.is_cancelled() {
            info!("Batch cancelled, waiting for in-flight items");
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Batch worker failed to join");
            }
        }

        let batch = {
            let mut batch = state.lock();
            let unadmitted = batch.items.iter().any(|i| !i.status.is_terminal());
            batch.status = if handle.is_cancelled() && unadmitted {
                BatchStatus::Cancelled
            } else {
                BatchStatus::Completed
            };
            batch.completed_at = Some(Utc::now());
            batch.clone()
        };

        let progress = batch.progress();
        info!(
            batch = %batch.id,
            status = batch.status.as_str(),
            completed = progress.completed,
            failed = progress.failed,
            pending = progress.pending,
            "Batch finished"
        );
        observer.on_batch_status(batch.status);
        batch
    }
}

fn finish_item(observer: &dyn BatchObserver, item: &BatchItem) {
    match item.status {
        ItemStatus::Completed => observer.on_item_complete(item),
        _ => {
            let message = item.error.as_deref().unwrap_or("unknown error");
            warn!(item = %item.id, error = message, "Batch item failed");
            observer.on_item_error(item, message);
        }
    }
}

/// Block admissions while paused
///
/// Returns false when the batch was cancelled while waiting.
async fn wait_while_paused(
    handle: &BatchHandle,
    state: &SharedBatch,
    observer: &dyn BatchObserver,
) -> bool {
    let mut paused = handle.paused.subscribe();
    if !*paused.borrow_and_update() {
        return !handle.is_cancelled();
    }

    state.lock().status = BatchStatus::Paused;
    info!("Batch paused");
    observer.on_batch_status(BatchStatus::Paused);

    loop {
        tokio::select! {
            _ = handle.cancel.cancelled() => return false,
            changed = paused.changed() => {
                if changed.is_err() || !*paused.borrow_and_update() {
                    break;
                }
            }
        }
    }

    state.lock().status = BatchStatus::Running;
    info!("Batch resumed");
    observer.on_batch_status(BatchStatus::Running);
    !handle.is_cancelled()
}
