//! AST Module - parsed workflow definitions
//!
//! Contains the Rust types for YAML workflow definitions:
//! - `workflow`: WorkflowDefinition, GlobalInputField, StepDefinition, InputMapping
//! - `condition`: StepCondition, ConditionOperator, ConditionValue
//!
//! These types represent the "what" - static structure parsed from YAML.
//! For execution, see the `runtime` module.

mod condition;
mod workflow;

pub use condition::{ConditionOperator, ConditionValue, StepCondition};
pub use workflow::{
    GlobalInputField, InputKind, InputMapping, Payload, StepDefinition, WorkflowDefinition,
    SCHEMA_V01,
};
