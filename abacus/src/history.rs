//! Calculation history

use abacus_core::Number;
use serde::{Deserialize, Serialize};

/// One performed calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    pub a: Number,
    pub b: Number,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<Number>,
}

impl Calculation {
    pub fn new(a: Number, b: Number, operation: impl Into<String>) -> Self {
        Self { a, b, operation: operation.into(), result: None }
    }

    pub fn with_result(mut self, result: Number) -> Self {
        self.result = Some(result);
        self
    }
}

impl std::fmt::Display for Calculation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.a, self.operation, self.b)?;
        if let Some(result) = &self.result {
            write!(f, " = {}", result)?;
        }
        Ok(())
    }
}

/// Append-only log of calculations in the order they were performed
#[derive(Debug, Clone, Default)]
pub struct CalculationHistory {
    records: Vec<Calculation>,
}

impl CalculationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: Calculation) {
        self.records.push(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn latest(&self) -> Option<&Calculation> {
        self.records.last()
    }

    /// Snapshot of every record, oldest first
    pub fn all(&self) -> Vec<Calculation> {
        self.records.clone()
    }

    /// Records performed with `operation`, oldest first
    pub fn filter_by_operation(&self, operation: &str) -> Vec<Calculation> {
        self.records
            .iter()
            .filter(|record| record.operation == operation)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }
}
