//! DAG Module - step ordering checks
//!
//! - `validate`: definition validation (acyclicity by declared order, referential integrity)
//! - `plan`: dependency levels for display

mod plan;
mod validate;

pub use plan::{ExecutionPlan, PlanLevel};
pub use validate::{validate_definition, DefinitionWarning, ValidationReport};
