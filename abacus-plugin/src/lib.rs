//! Abacus Plugin System
//!
//! Provides the pieces that turn an operation name into a runnable command:
//! - `OperationPlugin` / `Command` traits
//! - `CommandRegistry` (name to constructor)
//! - `PluginLoader` (TOML manifests declaring formula operations)

mod traits;
mod registry;
mod formula;
mod loader;

pub use traits::{Command, OperationPlugin, OperationMeta, OperationSource, BinaryCommand};
pub use registry::CommandRegistry;
pub use formula::{Formula, MAX_EXPONENT};
pub use loader::{PluginLoader, LoadReport, LoadFailure, FormulaOperation, MANIFEST_EXTENSION};

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::{
        Command, OperationPlugin, OperationMeta, OperationSource, BinaryCommand,
        CommandRegistry,
    };
    pub use abacus_core::prelude::*;
}
