//! Plugin traits

use abacus_core::{CalcError, Number};
use serde::Serialize;

/// Where an operation came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "unit", rename_all = "lowercase")]
pub enum OperationSource {
    /// Compiled into the binary
    Builtin,
    /// Declared by a plugin manifest (file name)
    Plugin(String),
}

/// Metadata for an operation plugin
#[derive(Debug, Clone, Serialize)]
pub struct OperationMeta {
    pub name: String,
    pub description: String,
    pub usage: String,
    pub source: OperationSource,
}

impl OperationMeta {
    pub fn builtin(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            usage: format!("{} <num1> <num2>", name),
            source: OperationSource::Builtin,
        }
    }
}

/// A calculation bound to its two operands, ready to run.
///
/// Implementations are stateless beyond the operands, so `execute` is
/// idempotent and free of side effects.
pub trait Command: Send {
    /// Registered name of the operation this command performs
    fn operation(&self) -> &str;
    fn operands(&self) -> (&Number, &Number);
    fn execute(&self) -> Result<Number, CalcError>;
}

/// Operation constructor stored in the registry
pub trait OperationPlugin: Send + Sync {
    fn meta(&self) -> OperationMeta;
    fn construct(&self, a: Number, b: Number) -> Box<dyn Command>;
}

/// Command for operations that are plain functions of two operands.
///
/// Built-in handlers are expressed as one of these, so they only have to
/// supply the arithmetic.
pub struct BinaryCommand {
    name: &'static str,
    a: Number,
    b: Number,
    apply: fn(&Number, &Number) -> Result<Number, CalcError>,
}

impl BinaryCommand {
    pub fn new(
        name: &'static str,
        a: Number,
        b: Number,
        apply: fn(&Number, &Number) -> Result<Number, CalcError>,
    ) -> Self {
        Self { name, a, b, apply }
    }
}

impl Command for BinaryCommand {
    fn operation(&self) -> &str {
        self.name
    }

    fn operands(&self) -> (&Number, &Number) {
        (&self.a, &self.b)
    }

    fn execute(&self) -> Result<Number, CalcError> {
        (self.apply)(&self.a, &self.b)
    }
}
