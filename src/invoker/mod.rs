//! # Skill Invoker Layer
//!
//! The engine's only contract with the outside world: run a skill with a
//! payload and get text back, or an error.
//!
//! - [`SkillInvoker`] - Core trait
//! - [`MockInvoker`] - Scripted responses for tests and dry runs
//! - [`CommandInvoker`] - Spawns a program per call (JSON on stdin, text on stdout)
//! - [`HttpInvoker`] - POSTs JSON to an endpoint
//!
//! Retry and backoff belong to the invoker implementation, not the engine.
//!
//! ## Creating Invokers
//!
//! ```rust
//! use skillflow::config::InvokerConfig;
//! use skillflow::invoker::create_invoker;
//!
//! let mock = create_invoker(&InvokerConfig::default());
//! assert!(mock.is_ok());
//! ```

mod command;
mod http;
mod mock;

pub use command::CommandInvoker;
pub use http::HttpInvoker;
pub use mock::MockInvoker;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::ast::Payload;
use crate::config::{InvokerConfig, InvokerKind};
use crate::error::SkillflowError;

// ============================================================================
// INVOKER TRAIT (ASYNC)
// ============================================================================

/// Runs one skill call
///
/// Implementations must be safe to call from many batch items at once.
#[async_trait]
pub trait SkillInvoker: Send + Sync {
    /// Invoker name ("mock", "command", "http")
    fn name(&self) -> &str;

    /// Run `skill_id` with `payload`; any error fails the calling step
    async fn invoke(&self, skill_id: &str, payload: &Payload) -> Result<String>;
}

/// Wire body sent by the command and http invokers
#[derive(Debug, Serialize)]
pub(crate) struct SkillRequest<'a> {
    pub skill_id: &'a str,
    pub payload: &'a Payload,
}

// ============================================================================
// INVOKER FACTORY
// ============================================================================

/// Create an invoker from configuration
///
/// | Kind | Requires |
/// |------|----------|
/// | `mock` | Nothing |
/// | `command` | `command` |
/// | `http` | `endpoint` |
pub fn create_invoker(config: &InvokerConfig) -> Result<Arc<dyn SkillInvoker>, SkillflowError> {
    let timeout = config.timeout_secs.map(Duration::from_secs);

    match config.kind {
        InvokerKind::Mock => Ok(Arc::new(MockInvoker::new())),
        InvokerKind::Command => {
            let program = config
                .command
                .as_deref()
                .ok_or_else(|| SkillflowError::InvokerConfig {
                    kind: config.kind.to_string(),
                    field: "command".into(),
                })?;
            let mut invoker = CommandInvoker::new(program).with_args(config.args.clone());
            if let Some(timeout) = timeout {
                invoker = invoker.with_timeout(timeout);
            }
            Ok(Arc::new(invoker))
        }
        InvokerKind::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| SkillflowError::InvokerConfig {
                    kind: config.kind.to_string(),
                    field: "endpoint".into(),
                })?;
            let mut invoker = HttpInvoker::new(endpoint);
            if let Some(timeout) = timeout {
                invoker = invoker.with_timeout(timeout);
            }
            Ok(Arc::new(invoker))
        }
    }
}
