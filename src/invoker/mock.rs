//! Mock invoker for testing
//!
//! Returns scripted responses without calling anything. Clones share state,
//! so a test can keep one handle for assertions and give another to the engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::SkillInvoker;
use crate::ast::Payload;

type FailurePredicate = Box<dyn Fn(&str, &Payload) -> bool + Send + Sync>;

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub skill_id: String,
    pub payload: Payload,
}

#[derive(Default)]
struct Script {
    /// skill_id → fixed response
    responses: FxHashMap<String, String>,
    /// skill_id → failure message
    failures: FxHashMap<String, String>,
    /// (predicate, message), checked in order
    conditional_failures: Vec<(FailurePredicate, String)>,
}

/// Mock invoker with scripted behavior
#[derive(Clone, Default)]
pub struct MockInvoker {
    script: Arc<Mutex<Script>>,
    latency: Duration,
    /// Track all calls made (for assertions)
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockInvoker {
    /// Responds `"<skill_id> output"` to every call
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed response for one skill
    pub fn with_response(self, skill_id: impl Into<String>, response: impl Into<String>) -> Self {
        self.script
            .lock()
            .responses
            .insert(skill_id.into(), response.into());
        self
    }

    /// Every call to `skill_id` fails with `message`
    pub fn with_failure(self, skill_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .failures
            .insert(skill_id.into(), message.into());
        self
    }

    /// Calls matching `predicate` fail with `message`
    pub fn fail_when<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&str, &Payload) -> bool + Send + Sync + 'static,
    {
        self.script
            .lock()
            .conditional_failures
            .push((Box::new(predicate), message.into()));
        self
    }

    /// Simulated per-call latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// All calls, in the order they started
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls made to one skill
    pub fn calls_for(&self, skill_id: &str) -> Vec<MockCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.skill_id == skill_id)
            .cloned()
            .collect()
    }

    /// Highest number of calls that were ever running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn outcome(&self, skill_id: &str, payload: &Payload) -> Result<String> {
        let script = self.script.lock();

        if let Some(message) = script.failures.get(skill_id) {
            return Err(anyhow!("{}", message));
        }
        if let Some((_, message)) = script
            .conditional_failures
            .iter()
            .find(|(predicate, _)| predicate(skill_id, payload))
        {
            return Err(anyhow!("{}", message));
        }

        Ok(script
            .responses
            .get(skill_id)
            .cloned()
            .unwrap_or_else(|| format!("{} output", skill_id)))
    }
}

/// Decrements the in-flight counter when a call ends, even on cancellation
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SkillInvoker for MockInvoker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, skill_id: &str, payload: &Payload) -> Result<String> {
        self.calls.lock().push(MockCall {
            skill_id: skill_id.to_string(),
            payload: payload.clone(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.outcome(skill_id, payload)
    }
}
