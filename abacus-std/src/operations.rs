//! Built-in arithmetic operations

use abacus_plugin::prelude::*;

pub struct Add;
pub struct Subtract;
pub struct Multiply;
pub struct Divide;
pub struct Mean;

impl OperationPlugin for Add {
    fn meta(&self) -> OperationMeta {
        OperationMeta::builtin("add", "Sum of the two operands")
    }

    fn construct(&self, a: Number, b: Number) -> Box<dyn Command> {
        Box::new(BinaryCommand::new("add", a, b, |a, b| Ok(a.add(b)?)))
    }
}

impl OperationPlugin for Subtract {
    fn meta(&self) -> OperationMeta {
        OperationMeta::builtin("subtract", "First operand minus the second")
    }

    fn construct(&self, a: Number, b: Number) -> Box<dyn Command> {
        Box::new(BinaryCommand::new("subtract", a, b, |a, b| Ok(a.sub(b)?)))
    }
}

impl OperationPlugin for Multiply {
    fn meta(&self) -> OperationMeta {
        OperationMeta::builtin("multiply", "Product of the two operands")
    }

    fn construct(&self, a: Number, b: Number) -> Box<dyn Command> {
        Box::new(BinaryCommand::new("multiply", a, b, |a, b| Ok(a.mul(b)?)))
    }
}

impl OperationPlugin for Divide {
    fn meta(&self) -> OperationMeta {
        OperationMeta::builtin("divide", "First operand divided by the second (divisor must be non-zero)")
    }

    fn construct(&self, a: Number, b: Number) -> Box<dyn Command> {
        Box::new(BinaryCommand::new("divide", a, b, divide))
    }
}

impl OperationPlugin for Mean {
    fn meta(&self) -> OperationMeta {
        OperationMeta::builtin("mean", "Arithmetic mean of the two operands")
    }

    fn construct(&self, a: Number, b: Number) -> Box<dyn Command> {
        Box::new(BinaryCommand::new("mean", a, b, mean))
    }
}

fn divide(a: &Number, b: &Number) -> Result<Number, CalcError> {
    if b.is_zero() {
        return Err(CalcError::div_zero());
    }
    Ok(a.checked_div(b)?)
}

fn mean(a: &Number, b: &Number) -> Result<Number, CalcError> {
    Ok(a.add(b)?.checked_div(&Number::from_i64(2))?)
}
