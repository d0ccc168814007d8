//! Execution Plan - dependency levels for display
//!
//! Groups steps into levels where every step only depends on steps from
//! earlier levels. Dependencies come from `previous` mappings, computed
//! tokens naming an earlier step's output key, and condition sources.
//!
//! The plan is informational: runs always execute steps in declared order.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{InputMapping, StepDefinition, WorkflowDefinition};
use crate::binding::extract_tokens;

/// Steps that could start together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLevel {
    pub index: usize,
    pub step_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub levels: Vec<PlanLevel>,
}

impl ExecutionPlan {
    /// Build the plan from a validated definition
    pub fn from_definition(definition: &WorkflowDefinition) -> Self {
        let global_ids: FxHashSet<&str> = definition
            .global_inputs
            .iter()
            .map(|i| i.id.as_str())
            .collect();

        // output_key → step_id, filled in declared order so only earlier steps match
        let mut writers: FxHashMap<&str, &str> = FxHashMap::default();
        let mut level_of: FxHashMap<&str, usize> = FxHashMap::default();
        let mut levels: Vec<PlanLevel> = Vec::new();

        for step in &definition.steps {
            let level = dependencies(step, &writers, &global_ids)
                .iter()
                .filter_map(|dep| level_of.get(dep))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);

            if level == levels.len() {
                levels.push(PlanLevel {
                    index: level,
                    step_ids: Vec::new(),
                });
            }
            levels[level].step_ids.push(step.id.clone());
            level_of.insert(&step.id, level);
            writers.insert(&step.output_key, &step.id);
        }

        Self { levels }
    }

    /// Largest number of steps sharing a level
    pub fn max_parallelism(&self) -> usize {
        self.levels
            .iter()
            .map(|l| l.step_ids.len())
            .max()
            .unwrap_or(1)
    }

    /// Text rendering, one line per level
    pub fn render(&self, definition: &WorkflowDefinition) -> String {
        let name_of = |id: &str| {
            definition
                .step(id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let mut lines = vec!["Execution Plan:".to_string(), "===============".to_string()];
        for level in &self.levels {
            match level.step_ids.as_slice() {
                [single] => lines.push(format!("{}. {}", level.index + 1, name_of(single))),
                many => {
                    lines.push(format!("{}. [INDEPENDENT]", level.index + 1));
                    for id in many {
                        lines.push(format!("   ├─ {}", name_of(id)));
                    }
                }
            }
        }
        lines.join("\n")
    }
}

/// Earlier steps a step reads from
fn dependencies<'a>(
    step: &'a StepDefinition,
    writers: &FxHashMap<&'a str, &'a str>,
    global_ids: &FxHashSet<&str>,
) -> Vec<&'a str> {
    let mut deps = Vec::new();

    for mapping in step.input_mappings.values() {
        match mapping {
            InputMapping::Previous { step_id, .. } => deps.push(step_id.as_str()),
            InputMapping::Computed { template } => {
                for token in extract_tokens(template) {
                    // Global values win over outputs with the same name
                    if global_ids.contains(token) {
                        continue;
                    }
                    if let Some(writer) = writers.get(token) {
                        deps.push(*writer);
                    }
                }
            }
            InputMapping::Global { .. } | InputMapping::Static { .. } => {}
        }
    }

    if let Some(condition) = &step.condition {
        deps.push(condition.source_step.as_str());
    }

    deps
}
