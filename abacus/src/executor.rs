//! Isolated command execution
//!
//! Every command runs on its own worker thread behind `catch_unwind`. The
//! outcome travels back over a one-shot channel, so a panicking handler or
//! one that never returns cannot take the caller down with it.

use abacus_core::{CalcError, Number};
use abacus_plugin::Command;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Default deadline for one calculation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy)]
pub struct IsolatedExecutor {
    timeout: Option<Duration>,
}

impl IsolatedExecutor {
    pub fn new() -> Self {
        Self { timeout: Some(DEFAULT_TIMEOUT) }
    }

    /// `None` waits for the worker however long it takes
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `command` on a fresh worker and block until it reports back or
    /// the deadline passes.
    ///
    /// Handler errors, panics and timeouts all come back as `Err` values.
    /// A worker that misses the deadline is detached; its late result is
    /// discarded when it tries to send.
    pub fn run_isolated(&self, command: Box<dyn Command>) -> Result<Number, CalcError> {
        let operation = command.operation().to_string();
        let (tx, rx) = mpsc::sync_channel(1);
        let started = Instant::now();

        let worker = thread::Builder::new()
            .name(format!("abacus-worker-{}", operation))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| command.execute()))
                    .unwrap_or_else(|payload| Err(CalcError::worker_fault(panic_message(payload.as_ref()))));
                // Receiver is gone if the caller already timed out
                let _ = tx.send(outcome);
            })
            .map_err(|e| CalcError::worker_fault(format!("failed to start worker: {}", e)))?;

        debug!(%operation, "worker started");

        let received = match self.timeout {
            Some(limit) => rx.recv_timeout(limit),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(outcome) => {
                // The worker has sent its only message; joining is immediate
                if worker.join().is_err() {
                    warn!(%operation, "worker exited abnormally after reporting");
                }
                debug!(%operation, elapsed_ms = started.elapsed().as_millis(), ok = outcome.is_ok(), "worker finished");
                outcome
            }
            Err(RecvTimeoutError::Timeout) => {
                let limit = self.timeout.unwrap_or_default();
                error!(%operation, timeout_ms = limit.as_millis(), "worker timed out, detaching");
                Err(CalcError::timeout(limit.as_millis()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!(%operation, "worker ended without reporting a result");
                Err(CalcError::worker_fault("worker ended without reporting a result"))
            }
        }
    }
}

impl Default for IsolatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort text of a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation handler panicked".to_string()
    }
}
