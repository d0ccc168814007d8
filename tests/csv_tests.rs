//! # CSV Bridge Tests
//!
//! Import into input sets, run a batch, export the results.

use std::collections::BTreeMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use skillflow::ast::{Payload, WorkflowDefinition};
use skillflow::csv::{escape_csv_value, export_batch_results_to_csv, parse_csv, parse_csv_to_input_sets};
use skillflow::invoker::MockInvoker;
use skillflow::runtime::{BatchHandle, BatchOptions, BatchScheduler, NoopObserver, StepExecutor};

fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_quoted_comma_round_trip() {
    let sets = parse_csv_to_input_sets(
        "Name,Age\nJohn,30\n\"Doe, Jane\",25",
        &mapping(&[("Name", "fullName")]),
    );
    assert_eq!(
        sets,
        vec![
            Payload::from([("fullName".to_string(), "John".to_string())]),
            Payload::from([("fullName".to_string(), "Doe, Jane".to_string())]),
        ]
    );
}

#[test]
fn test_escaping_comma_and_quote() {
    assert_eq!(escape_csv_value("a,b\"c"), "\"a,b\"\"c\"");
}

#[test]
fn test_exported_cells_parse_back() {
    let nasty = "line one\nsaid \"hi\", then left";
    let exported = format!("Col\n{}", escape_csv_value(nasty));
    let table = parse_csv(&exported);
    assert_eq!(table.rows, vec![vec![nasty.to_string()]]);
}

#[tokio::test]
async fn test_csv_in_batch_out() {
    let def = Arc::new(
        WorkflowDefinition::from_yaml(
            r#"
schema: skillflow/workflow@0.1
id: notes
name: Notes
global_inputs:
  - id: company
    label: Company
    required: true
  - id: role
    label: Role
steps:
  - id: s1
    skill_id: note
    name: Thank You Note
    output_key: note
    input_mappings:
      brief: { type: computed, template: "{{role}} at {{company}}" }
"#,
        )
        .unwrap(),
    );

    let csv = "Company Name,Position\nAcme,\"Engineer, Senior\"\n,Designer\nGlobex,PM\n";
    let sets = parse_csv_to_input_sets(
        csv,
        &mapping(&[("Company Name", "company"), ("Position", "role")]),
    );
    assert_eq!(sets.len(), 3);

    let mock = MockInvoker::new().with_response("note", "Thanks, team");
    let scheduler = BatchScheduler::new(
        StepExecutor::new(Arc::new(mock)),
        BatchOptions {
            concurrency: 2,
            delay_ms: 0,
        },
    );
    let batch = scheduler
        .run(def.clone(), sets, Arc::new(NoopObserver), BatchHandle::new())
        .await;

    let exported = export_batch_results_to_csv(&batch, &def);
    let table = parse_csv(&exported);

    assert_eq!(
        table.headers,
        vec![
            "Item ID",
            "Status",
            "Started At",
            "Completed At",
            "Input: Company",
            "Input: Role",
            "Output: Thank You Note"
        ]
    );
    let summary: Vec<(&str, &str, &str, &str)> = table
        .rows
        .iter()
        .map(|r| (r[0].as_str(), r[1].as_str(), r[5].as_str(), r[6].as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("item-1", "completed", "Engineer, Senior", "Thanks, team"),
            ("item-2", "error", "Designer", ""),
            ("item-3", "completed", "PM", "Thanks, team"),
        ]
    );
    assert!(table.rows[0][2].ends_with('Z'));
}
