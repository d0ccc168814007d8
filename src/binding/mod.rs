//! Binding Module - how a step's payload is built
//!
//! - `template`: `{{identifier}}` interpolation against a flat scope
//! - `resolve`: `ExecutionScope` and `resolve_payload` for input mappings

mod resolve;
mod template;

pub use resolve::{resolve_payload, ExecutionScope};
pub use template::{extract_tokens, interpolate, interpolate_report, Interpolation, ValueScope};
