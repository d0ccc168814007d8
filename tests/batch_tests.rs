//! # Batch Scheduler Tests
//!
//! Many runs of one workflow under a concurrency cap:
//! - failed items never fail the batch
//! - running items never exceed the cap; counts always add up
//! - pause holds admissions, resume continues
//! - cancel stops admissions, in-flight items finish

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use skillflow::ast::{Payload, WorkflowDefinition};
use skillflow::invoker::MockInvoker;
use skillflow::runtime::{BatchHandle, BatchObserver, BatchOptions, BatchScheduler, StepExecutor};
use skillflow::store::{BatchItem, BatchProgress, BatchStatus, ItemStatus};

// ============================================================================
// TEST HELPERS
// ============================================================================

fn definition() -> Arc<WorkflowDefinition> {
    Arc::new(
        WorkflowDefinition::from_yaml(
            r#"
schema: skillflow/workflow@0.1
id: outreach
name: Outreach
global_inputs:
  - id: company
    label: Company
    required: true
steps:
  - id: research
    skill_id: company-research
    name: Research
    output_key: research
    input_mappings:
      company: { type: global, input_id: company }
  - id: email
    skill_id: cold-email
    name: Email
    output_key: email
    input_mappings:
      research: { type: previous, step_id: research, output_key: research }
      company: { type: global, input_id: company }
"#,
        )
        .unwrap(),
    )
}

fn input_sets(companies: &[&str]) -> Vec<Payload> {
    companies
        .iter()
        .map(|c| Payload::from([("company".to_string(), c.to_string())]))
        .collect()
}

fn scheduler(mock: &MockInvoker, concurrency: usize) -> BatchScheduler {
    BatchScheduler::new(
        StepExecutor::new(Arc::new(mock.clone())),
        BatchOptions {
            concurrency,
            delay_ms: 0,
        },
    )
}

/// Records every callback; optionally cancels after the first completion
#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<BatchProgress>>,
    statuses: Mutex<Vec<BatchStatus>>,
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    errors: Mutex<Vec<(String, String)>>,
    cancel_after_first: Option<BatchHandle>,
}

impl BatchObserver for Recorder {
    fn on_item_start(&self, item: &BatchItem) {
        assert_eq!(item.status, ItemStatus::Running);
        self.started.lock().push(item.id.clone());
    }

    fn on_item_complete(&self, item: &BatchItem) {
        assert_eq!(item.status, ItemStatus::Completed);
        self.completed.lock().push(item.id.clone());
        if let Some(handle) = &self.cancel_after_first {
            handle.cancel();
        }
    }

    fn on_item_error(&self, item: &BatchItem, message: &str) {
        assert_eq!(item.status, ItemStatus::Error);
        self.errors.lock().push((item.id.clone(), message.to_string()));
    }

    fn on_progress(&self, progress: BatchProgress) {
        self.progress.lock().push(progress);
    }

    fn on_batch_status(&self, status: BatchStatus) {
        self.statuses.lock().push(status);
    }
}

// ============================================================================
// INDEPENDENT ITEMS
// ============================================================================

#[tokio::test]
async fn test_failed_item_does_not_fail_the_batch() {
    let mock = MockInvoker::new().fail_when(
        |skill, payload| skill == "cold-email" && payload.get("company").map(String::as_str) == Some("Globex"),
        "rate limited",
    );
    let recorder = Arc::new(Recorder::default());

    let batch = scheduler(&mock, 2)
        .run(
            definition(),
            input_sets(&["Acme", "Globex", "Initech"]),
            recorder.clone(),
            BatchHandle::new(),
        )
        .await;

    assert_eq!(batch.status, BatchStatus::Completed);
    let statuses: Vec<ItemStatus> = batch.items.iter().map(|i| i.status).collect();
    assert_eq!(
        statuses,
        vec![ItemStatus::Completed, ItemStatus::Error, ItemStatus::Completed]
    );

    let failed = &batch.items[1];
    assert!(failed.error.as_deref().unwrap().contains("rate limited"));
    // The failed run still records what finished before the failing step
    let run = failed.result.as_ref().unwrap();
    assert_eq!(run.output("research"), Some("company-research output"));
    assert_eq!(run.failed_step(), Some("email"));

    let errors = recorder.errors.lock().clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "item-2");

    let summary = batch.summary();
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);
    assert!((summary.success_rate - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_items_run_with_their_own_inputs() {
    let mock = MockInvoker::new();
    let batch = scheduler(&mock, 3)
        .run(
            definition(),
            input_sets(&["Acme", "Globex", "Initech"]),
            Arc::new(Recorder::default()),
            BatchHandle::new(),
        )
        .await;

    for item in &batch.items {
        let run = item.result.as_ref().unwrap();
        assert_eq!(run.global_inputs, item.inputs);
    }
    let mut companies: Vec<String> = mock
        .calls_for("cold-email")
        .into_iter()
        .map(|c| c.payload["company"].clone())
        .collect();
    companies.sort();
    assert_eq!(companies, vec!["Acme", "Globex", "Initech"]);
}

// ============================================================================
// CONCURRENCY BOUND + PROGRESS CONSERVATION
// ============================================================================

#[tokio::test]
async fn test_running_items_never_exceed_concurrency() {
    let mock = MockInvoker::new().with_latency(Duration::from_millis(30));
    let recorder = Arc::new(Recorder::default());

    let batch = scheduler(&mock, 2)
        .run(
            definition(),
            input_sets(&["a", "b", "c", "d", "e", "f"]),
            recorder.clone(),
            BatchHandle::new(),
        )
        .await;

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.progress().completed, 6);
    assert_eq!(mock.max_in_flight(), 2);

    let snapshots = recorder.progress.lock().clone();
    // One snapshot per start and per finish
    assert_eq!(snapshots.len(), 12);
    for p in &snapshots {
        assert!(p.running <= 2, "running {} > concurrency", p.running);
        assert_eq!(p.pending + p.running + p.completed + p.failed, p.total);
        assert_eq!(p.total, 6);
    }
    assert_eq!(recorder.started.lock().len(), 6);
}

// ============================================================================
// PAUSE / RESUME / CANCEL
// ============================================================================

#[tokio::test]
async fn test_pause_holds_admissions_until_resume() {
    let mock = MockInvoker::new();
    let recorder = Arc::new(Recorder::default());
    let handle = BatchHandle::new();
    handle.pause();

    let task = {
        let scheduler = scheduler(&mock, 2);
        let recorder = recorder.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            scheduler
                .run(definition(), input_sets(&["a", "b", "c"]), recorder, handle)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.call_count(), 0);
    assert!(recorder.started.lock().is_empty());

    handle.resume();
    let batch = task.await.unwrap();

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.progress().completed, 3);
    assert_eq!(
        recorder.statuses.lock().clone(),
        vec![
            BatchStatus::Running,
            BatchStatus::Paused,
            BatchStatus::Running,
            BatchStatus::Completed
        ]
    );
}

#[tokio::test]
async fn test_cancel_lets_in_flight_items_finish() {
    let mock = MockInvoker::new().with_latency(Duration::from_millis(20));
    let handle = BatchHandle::new();
    let recorder = Arc::new(Recorder {
        cancel_after_first: Some(handle.clone()),
        ..Recorder::default()
    });

    let batch = scheduler(&mock, 1)
        .run(
            definition(),
            input_sets(&["a", "b", "c", "d"]),
            recorder.clone(),
            handle,
        )
        .await;

    assert_eq!(batch.status, BatchStatus::Cancelled);
    assert_eq!(batch.items[0].status, ItemStatus::Completed);
    for item in &batch.items[1..] {
        assert_eq!(item.status, ItemStatus::Pending);
        assert!(item.started_at.is_none());
    }
    assert_eq!(recorder.started.lock().clone(), vec!["item-1"]);
    assert_eq!(recorder.statuses.lock().last(), Some(&BatchStatus::Cancelled));
}

#[tokio::test]
async fn test_cancel_after_everything_admitted_is_completed() {
    let mock = MockInvoker::new().with_latency(Duration::from_millis(20));
    let handle = BatchHandle::new();
    let recorder = Arc::new(Recorder {
        cancel_after_first: Some(handle.clone()),
        ..Recorder::default()
    });

    // Both items are admitted before either finishes
    let batch = scheduler(&mock, 2)
        .run(definition(), input_sets(&["a", "b"]), recorder, handle)
        .await;

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.progress().completed, 2);
}
