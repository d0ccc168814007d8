//! CSV Bridge - input sets in, batch results out
//!
//! - `parse`: hand-rolled RFC 4180 parser and column mapping
//! - `export`: batch results as CSV text

mod export;
mod parse;

pub use export::{escape_csv_value, export_batch_results_to_csv};
pub use parse::{
    check_column_mapping, input_sets_from_table, parse_csv, parse_csv_to_input_sets, CsvTable,
    SkippedRow,
};
