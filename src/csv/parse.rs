//! CSV Import - RFC 4180 style parsing into batch input sets
//!
//! Quoting rules:
//! - A field starting with `"` (after optional blanks) is quoted; commas,
//!   CR and LF inside it are literal
//! - `""` inside a quoted field is one literal `"`
//! - Quoted content is kept verbatim; unquoted fields are trimmed
//! - A `"` in the middle of an unquoted field is literal
//!
//! Malformed rows (text after a closing quote, an unterminated quote, more
//! fields than the header) are skipped with a warning. A malformed header
//! yields an empty table with the header recorded as skipped. Blank lines are
//! ignored.

use std::collections::BTreeMap;

use tracing::warn;

use crate::ast::{Payload, WorkflowDefinition};
use crate::error::{Result, SkillflowError};

/// Parsed CSV text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows dropped as malformed
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line the row starts on
    pub line: usize,
    pub reason: String,
}

impl CsvTable {
    /// Index of the first column named `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    AfterQuoted,
}

/// One record being assembled
struct Record {
    line: usize,
    fields: Vec<String>,
    field: String,
    quoted: bool,
    error: Option<String>,
}

impl Record {
    fn new(line: usize) -> Self {
        Self {
            line,
            fields: Vec::new(),
            field: String::new(),
            quoted: false,
            error: None,
        }
    }

    fn end_field(&mut self) {
        let raw = std::mem::take(&mut self.field);
        let value = if self.quoted {
            raw
        } else {
            raw.trim().to_string()
        };
        self.fields.push(value);
        self.quoted = false;
    }

    fn fail(&mut self, reason: String) {
        if self.error.is_none() {
            self.error = Some(reason);
        }
    }

    fn is_blank(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].is_empty() && self.error.is_none()
    }
}

/// Split CSV text into records, honouring quotes
fn records(text: &str) -> Vec<Record> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut out = Vec::new();
    let mut line = 1;
    let mut record = Record::new(line);
    let mut state = State::FieldStart;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        // Record boundary outside quotes
        if state != State::Quoted && (c == '\n' || c == '\r') {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            record.end_field();
            line += 1;
            out.push(std::mem::replace(&mut record, Record::new(line)));
            state = State::FieldStart;
            continue;
        }

        match state {
            State::FieldStart => match c {
                ',' => record.end_field(),
                '"' if record.field.trim().is_empty() => {
                    record.field.clear();
                    record.quoted = true;
                    state = State::Quoted;
                }
                ' ' | '\t' => record.field.push(c),
                _ => {
                    record.field.push(c);
                    state = State::Unquoted;
                }
            },
            State::Unquoted => match c {
                ',' => {
                    record.end_field();
                    state = State::FieldStart;
                }
                _ => record.field.push(c),
            },
            State::Quoted => match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    record.field.push('"');
                }
                '"' => state = State::AfterQuoted,
                '\n' => {
                    line += 1;
                    record.field.push(c);
                }
                _ => record.field.push(c),
            },
            State::AfterQuoted => match c {
                ',' => {
                    record.end_field();
                    state = State::FieldStart;
                }
                ' ' | '\t' => {}
                other => {
                    record.fail(format!("unexpected '{}' after closing quote", other));
                    record.field.push(other);
                }
            },
        }
    }

    if state == State::Quoted {
        record.fail("unterminated quoted field".to_string());
    }
    let has_content = state != State::FieldStart || !record.fields.is_empty() || !record.field.is_empty();
    if has_content {
        record.end_field();
        out.push(record);
    }

    out
}

/// Parse CSV text: first non-blank record is the header
pub fn parse_csv(text: &str) -> CsvTable {
    let mut table = CsvTable::default();
    let mut header_seen = false;

    for record in records(text) {
        if record.is_blank() {
            continue;
        }

        if !header_seen {
            header_seen = true;
            // Without a usable header no row can be mapped
            if let Some(reason) = record.error {
                let err = SkillflowError::CsvFormat {
                    line: record.line,
                    reason: format!("header: {}", reason),
                };
                warn!("{}; nothing imported", err);
                table.skipped.push(SkippedRow {
                    line: record.line,
                    reason,
                });
                return table;
            }
            table.headers = record.fields;
            continue;
        }

        let reason = match record.error {
            Some(reason) => Some(reason),
            None if record.fields.len() > table.headers.len() => Some(format!(
                "{} fields but the header has {}",
                record.fields.len(),
                table.headers.len()
            )),
            None => None,
        };

        match reason {
            Some(reason) => {
                let err = SkillflowError::CsvFormat {
                    line: record.line,
                    reason: reason.clone(),
                };
                warn!("{}; row skipped", err);
                table.skipped.push(SkippedRow {
                    line: record.line,
                    reason,
                });
            }
            None => table.rows.push(record.fields),
        }
    }

    table
}

/// Build input sets from CSV text
///
/// `column_mapping` is CSV header → global input id. Each row keeps only
/// mapped columns with a non-empty value; rows left empty are dropped.
pub fn parse_csv_to_input_sets(text: &str, column_mapping: &BTreeMap<String, String>) -> Vec<Payload> {
    input_sets_from_table(&parse_csv(text), column_mapping)
}

/// Same as [`parse_csv_to_input_sets`] for an already parsed table
pub fn input_sets_from_table(table: &CsvTable, column_mapping: &BTreeMap<String, String>) -> Vec<Payload> {
    let columns: Vec<(usize, &str)> = column_mapping
        .iter()
        .filter_map(|(column, input_id)| match table.column_index(column) {
            Some(idx) => Some((idx, input_id.as_str())),
            None => {
                warn!(column = %column, "Mapped column is not in the CSV header");
                None
            }
        })
        .collect();

    table
        .rows
        .iter()
        .filter_map(|row| {
            let inputs: Payload = columns
                .iter()
                .filter_map(|(idx, input_id)| {
                    row.get(*idx)
                        .filter(|v| !v.is_empty())
                        .map(|v| (input_id.to_string(), v.clone()))
                })
                .collect();
            (!inputs.is_empty()).then_some(inputs)
        })
        .collect()
}

/// Strict mapping check for callers that want errors instead of warnings
///
/// Every mapped column must exist in the header and every target must be a
/// global input of `definition`.
pub fn check_column_mapping(
    table: &CsvTable,
    column_mapping: &BTreeMap<String, String>,
    definition: &WorkflowDefinition,
) -> Result<()> {
    for (column, input_id) in column_mapping {
        if table.column_index(column).is_none() {
            return Err(SkillflowError::UnknownColumn {
                column: column.clone(),
            });
        }
        if definition.global_input(input_id).is_none() {
            return Err(SkillflowError::UnknownMappingTarget {
                input_id: input_id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn quoted_comma_is_literal() {
        let sets = parse_csv_to_input_sets(
            "Name,Age\nJohn,30\n\"Doe, Jane\",25",
            &mapping(&[("Name", "fullName")]),
        );
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0]["fullName"], "John");
        assert_eq!(sets[1]["fullName"], "Doe, Jane");
    }

    #[test]
    fn doubled_quote_is_one_quote() {
        let table = parse_csv("a,b\n\"say \"\"hi\"\"\",x\n");
        assert_eq!(table.rows, vec![vec!["say \"hi\"".to_string(), "x".to_string()]]);
    }

    #[test]
    fn newline_inside_quotes_and_crlf() {
        let table = parse_csv("note,id\r\n\"line one\nline two\",1\r\nplain,2\r\n");
        assert_eq!(table.headers, vec!["note", "id"]);
        assert_eq!(table.rows[0][0], "line one\nline two");
        assert_eq!(table.rows[1], vec!["plain", "2"]);
    }

    #[test]
    fn unquoted_trimmed_quoted_verbatim() {
        let table = parse_csv("a,b\n  padded  , \"  kept  \" \n");
        assert_eq!(table.rows[0], vec!["padded", "  kept  "]);
    }

    #[test]
    fn stray_quote_in_unquoted_field_is_literal() {
        let table = parse_csv("a\n5\" screen\n");
        assert_eq!(table.rows[0], vec!["5\" screen"]);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let table = parse_csv("a,b\n\"x\"y,1\nok,2\n1,2,3\n\"open,4");
        assert_eq!(table.rows, vec![vec!["ok".to_string(), "2".to_string()]]);
        let lines: Vec<usize> = table.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 4, 5]);
        assert!(table.skipped[0].reason.contains("after closing quote"));
        assert!(table.skipped[2].reason.contains("unterminated"));
    }

    #[test]
    fn malformed_header_imports_nothing() {
        let table = parse_csv("\"open,h\nrow,1\n");
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
        assert_eq!(table.skipped.len(), 1);
        assert_eq!(table.skipped[0].line, 1);
        assert!(table.skipped[0].reason.contains("unterminated"));

        let sets = parse_csv_to_input_sets("\"open,h\nrow,1\n", &mapping(&[("open", "x")]));
        assert!(sets.is_empty());
    }

    #[test]
    fn blank_lines_and_empty_records_dropped() {
        let sets = parse_csv_to_input_sets(
            "\nName,Email\n\nAnn,\n,\n  ,bob@example.com\n",
            &mapping(&[("Name", "name"), ("Email", "email")]),
        );
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].get("name").map(String::as_str), Some("Ann"));
        assert!(!sets[0].contains_key("email"));
        assert_eq!(sets[1]["email"], "bob@example.com");
    }

    #[test]
    fn short_rows_are_kept() {
        let sets = parse_csv_to_input_sets("a,b\n1\n", &mapping(&[("a", "x"), ("b", "y")]));
        assert_eq!(sets, vec![Payload::from([("x".to_string(), "1".to_string())])]);
    }

    #[test]
    fn unknown_mapped_column_is_ignored() {
        let sets = parse_csv_to_input_sets("a\n1\n", &mapping(&[("a", "x"), ("zzz", "y")]));
        assert_eq!(sets.len(), 1);
        assert!(!sets[0].contains_key("y"));
    }

    #[test]
    fn header_only_or_empty_text() {
        assert!(parse_csv_to_input_sets("", &mapping(&[("a", "x")])).is_empty());
        assert!(parse_csv_to_input_sets("a,b\n", &mapping(&[("a", "x")])).is_empty());
    }

    #[test]
    fn bom_is_stripped() {
        let table = parse_csv("\u{feff}Name\nAnn");
        assert_eq!(table.headers, vec!["Name"]);
    }

    #[test]
    fn strict_mapping_check() {
        let def = WorkflowDefinition::from_yaml(
            "schema: skillflow/workflow@0.1\nid: w\nname: W\nglobal_inputs:\n  - id: name\n    label: Name\nsteps: []\n",
        )
        .unwrap();
        let table = parse_csv("Name,Other\nAnn,x\n");

        assert!(check_column_mapping(&table, &mapping(&[("Name", "name")]), &def).is_ok());
        assert_eq!(
            check_column_mapping(&table, &mapping(&[("Nope", "name")]), &def)
                .unwrap_err()
                .code(),
            "SKF-041"
        );
        assert_eq!(
            check_column_mapping(&table, &mapping(&[("Other", "ghost")]), &def)
                .unwrap_err()
                .code(),
            "SKF-042"
        );
    }
}
