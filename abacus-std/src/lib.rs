//! Abacus Standard Library

pub mod operations;

use abacus_plugin::CommandRegistry;

/// Load the built-in operations into registry
pub fn load_standard_library(registry: CommandRegistry) -> CommandRegistry {
    registry
        .with_operation(operations::Add)
        .with_operation(operations::Subtract)
        .with_operation(operations::Multiply)
        .with_operation(operations::Divide)
        .with_operation(operations::Mean)
}

/// Create registry with standard library
pub fn standard_registry() -> CommandRegistry {
    load_standard_library(CommandRegistry::new())
}
