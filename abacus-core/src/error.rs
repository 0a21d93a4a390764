//! Structured calculator errors
//!
//! Errors never crash the calculator. They are values that travel back to
//! the nearest boundary (parser, registry, executor, loader) and end up as
//! a printed line.

use crate::NumberError;
use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const UNKNOWN_OPERATION: &str = "UNKNOWN_OPERATION";
    pub const DIV_ZERO: &str = "DIV_ZERO";
    pub const DOMAIN_ERROR: &str = "DOMAIN_ERROR";
    pub const WORKER_FAULT: &str = "WORKER_FAULT";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const PLUGIN_LOAD: &str = "PLUGIN_LOAD";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, but processing continued
    Warning,
    /// The current request failed
    Error,
    /// The calculator cannot continue
    Fatal,
}

/// Structured calculator error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Severity level
    pub severity: Severity,
}

impl CalcError {
    /// Create a new error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    // ========== Common Error Constructors ==========

    pub fn parse_error(input: impl Into<String>) -> Self {
        let input = input.into();
        Self::new(codes::PARSE_ERROR, format!("'{}' is not a valid number", input))
            .with_suggestion("Use a decimal literal such as 42, -3.5 or 1.5e3")
    }

    pub fn unknown_operation(name: &str) -> Self {
        Self::new(codes::UNKNOWN_OPERATION, format!("Unknown operation: {}", name))
            .with_suggestion("Type 'menu' to list available operations")
    }

    pub fn div_zero() -> Self {
        Self::new(codes::DIV_ZERO, "Cannot divide by zero.")
            .with_suggestion("Ensure divisor is not zero")
    }

    pub fn domain_error(details: impl Into<String>) -> Self {
        Self::new(codes::DOMAIN_ERROR, format!("Domain error: {}", details.into()))
    }

    pub fn worker_fault(details: impl Into<String>) -> Self {
        Self::new(codes::WORKER_FAULT, details)
            .with_suggestion("The operation handler failed; check the plugin that provides it")
    }

    pub fn timeout(millis: u128) -> Self {
        Self::new(codes::TIMEOUT, format!("Calculation timed out after {} ms", millis))
            .with_suggestion("Raise the timeout with --timeout-ms or ABACUS_TIMEOUT_MS")
    }

    pub fn plugin_load(unit: &str, details: impl Into<String>) -> Self {
        Self::new(codes::PLUGIN_LOAD, format!("Failed to load plugin '{}': {}", unit, details.into()))
            .with_severity(Severity::Warning)
    }

    pub fn config(details: impl Into<String>) -> Self {
        Self::new(codes::CONFIG_ERROR, format!("Configuration error: {}", details.into()))
            .with_severity(Severity::Fatal)
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, format!("Internal error: {}", details.into()))
            .with_suggestion("This is a bug, please report it")
            .with_severity(Severity::Fatal)
    }
}

impl std::fmt::Display for CalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CalcError {}

impl From<NumberError> for CalcError {
    fn from(err: NumberError) -> Self {
        match err {
            NumberError::ParseError(s) => Self::parse_error(s),
            NumberError::DivisionByZero => Self::div_zero(),
            NumberError::DomainError(s) => Self::domain_error(s),
            NumberError::Overflow => Self::domain_error("result out of range"),
        }
    }
}
