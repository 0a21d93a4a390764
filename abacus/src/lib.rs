//! Abacus - command-dispatch calculator engine

pub mod config;
mod executor;
mod history;
pub mod render;

pub use config::{CalcConfig, ConfigError, LogFormat};
pub use executor::{IsolatedExecutor, DEFAULT_TIMEOUT};
pub use history::{Calculation, CalculationHistory};

use abacus_core::{CalcError, Number};
use abacus_plugin::CommandRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Calculator context: the registry to dispatch through, the executor that
/// isolates each run, and the history of successful calculations.
pub struct Calculator {
    registry: Arc<CommandRegistry>,
    executor: IsolatedExecutor,
    history: CalculationHistory,
}

impl Calculator {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            executor: IsolatedExecutor::new(),
            history: CalculationHistory::new(),
        }
    }

    pub fn with_standard_library() -> Self {
        Self::new(abacus_std::standard_registry())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn history(&self) -> &CalculationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CalculationHistory {
        &mut self.history
    }

    pub fn operation_names(&self) -> Vec<String> {
        self.registry.list_names()
    }

    /// Parse both operands, dispatch `operation` and run it isolated.
    ///
    /// Operands are parsed before the lookup, so bad input is reported even
    /// for an unknown operation. Successful calculations are appended to
    /// the history.
    pub fn perform(&mut self, value1: &str, value2: &str, operation: &str) -> Result<Number, CalcError> {
        info!(%operation, %value1, %value2, "performing calculation");

        let (a, b) = match (value1.parse::<Number>(), value2.parse::<Number>()) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                info!(%value1, %value2, "invalid operand");
                return Err(e.into());
            }
        };

        let command = self.registry.construct(operation, a.clone(), b.clone()).inspect_err(|_| {
            info!(%operation, "unknown operation");
        })?;

        let outcome = self.executor.run_isolated(command);
        match &outcome {
            Ok(result) => {
                info!(%operation, %result, "calculation succeeded");
                self.history.append(Calculation::new(a, b, operation).with_result(result.clone()));
            }
            Err(error) => warn!(%operation, code = %error.code, %error, "calculation failed"),
        }
        outcome
    }

    /// [`perform`](Self::perform) followed by [`render::outcome_line`]
    pub fn perform_and_render(&mut self, value1: &str, value2: &str, operation: &str) -> String {
        let outcome = self.perform(value1, value2, operation);
        render::outcome_line(value1, value2, operation, &outcome)
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::with_standard_library()
    }
}
