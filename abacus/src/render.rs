//! Output rendering
//!
//! Turns calculation outcomes into the lines printed to the user.

use crate::Calculation;
use abacus_core::{codes, CalcError, Number};
use abacus_plugin::OperationMeta;

/// Line reporting the outcome of one calculation.
///
/// `value1` and `value2` are echoed exactly as typed.
pub fn outcome_line(value1: &str, value2: &str, operation: &str, outcome: &Result<Number, CalcError>) -> String {
    match outcome {
        Ok(result) => format!("The result of {} {} {} is {}", value1, operation, value2, result),
        Err(e) if e.is(codes::PARSE_ERROR) => {
            format!("Invalid input: {} or {} is not a valid number.", value1, value2)
        }
        Err(e) if e.is(codes::UNKNOWN_OPERATION) => format!("Invalid operation type: {}", operation),
        Err(e) if e.is(codes::DIV_ZERO) => format!("Error: {}", e.message),
        Err(e) => format!("An error occurred: {}", e),
    }
}

pub fn menu_line(names: &[String]) -> String {
    format!("Available commands: {}", names.join(", "))
}

/// One line per operation: name, description, usage
pub fn help_lines(operations: &[OperationMeta]) -> Vec<String> {
    let width = operations.iter().map(|op| op.name.len()).max().unwrap_or(0);
    operations
        .iter()
        .map(|op| format!("  {:<width$}  {}  [{}]", op.name, op.description, op.usage, width = width))
        .collect()
}

/// Numbered history listing, oldest first
pub fn history_lines(records: &[Calculation]) -> Vec<String> {
    if records.is_empty() {
        return vec!["No calculations in history.".to_string()];
    }
    records
        .iter()
        .enumerate()
        .map(|(i, record)| format!("{}. {}", i + 1, record))
        .collect()
}
