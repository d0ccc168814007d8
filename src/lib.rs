//! Skillflow - chain skill invocations into pipelines, replay them over CSV batches
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  ast/       YAML → Rust types (WorkflowDefinition, mappings) │
//! │  catalog/   Validated definitions keyed by id                │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  binding/   Template interpolation, input mapping resolution │
//! │  dag/       Definition validation, execution plan            │
//! │  runtime/   StepExecutor (one run), BatchScheduler (many)    │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  store/     WorkflowExecution, BatchExecution                │
//! │  csv/       CSV import into input sets, results export       │
//! │  invoker/   Skill invokers (mock, command, http)             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`ast`] | YAML parsing → `WorkflowDefinition`, `InputMapping`, `StepCondition` |
//! | [`catalog`] | Explicit workflow catalog (built-ins + a directory) |
//! | [`binding`] | `{{token}}` interpolation and payload resolution |
//! | [`dag`] | Definition checks and dependency levels |
//! | [`runtime`] | Fail-fast runs and bounded-concurrency batches |
//! | [`store`] | Run and batch records, progress, summary |
//! | [`csv`] | RFC 4180 style parsing and export |
//! | [`invoker`] | `SkillInvoker` trait and implementations |
//! | [`config`] | `~/.config/skillflow/config.toml` + env overrides |
//! | [`error`] | Error types with fix suggestions |

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - YAML → Rust types
// ═══════════════════════════════════════════════════════════════
pub mod ast;
pub mod catalog;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - Execution logic
// ═══════════════════════════════════════════════════════════════
pub mod binding;
pub mod dag;
pub mod runtime;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - State, CSV, invokers
// ═══════════════════════════════════════════════════════════════
pub mod csv;
pub mod invoker;
pub mod store;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// Re-exports for the common entry points
pub use ast::{InputMapping, Payload, WorkflowDefinition};
pub use catalog::Catalog;
pub use config::SkillflowConfig;
pub use error::{FixSuggestion, Result, SkillflowError};
pub use invoker::{create_invoker, MockInvoker, SkillInvoker};
pub use runtime::{BatchHandle, BatchObserver, BatchOptions, BatchScheduler, StepExecutor};
pub use store::{BatchExecution, BatchStatus, ItemStatus, RunStatus, WorkflowExecution};
