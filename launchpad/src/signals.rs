//! Ctrl+C handling.
//!
//! While a child runs in the foreground the terminal delivers the interrupt to
//! both processes; the launcher only records it and lets the child decide how
//! to exit, so the final pause still happens. Outside a child run (the
//! launcher's own work, or waiting at the pause prompt) Ctrl+C exits the
//! launcher with 130 and the pause is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use launchpad_env::{ExitOutcome, ProcessRunner, ProcessSpec};

/// Conventional 128 + SIGINT.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

#[derive(Debug, Default)]
pub struct InterruptState {
    interrupted: AtomicBool,
    foreground: AtomicBool,
}

impl InterruptState {
    /// Register the process-wide Ctrl+C handler. Can only succeed once per process.
    pub fn install() -> Result<Arc<Self>> {
        let state = Arc::new(Self::default());
        let handler_state = state.clone();
        ctrlc::set_handler(move || {
            if handler_state.record_interrupt() {
                std::process::exit(INTERRUPT_EXIT_CODE);
            }
            tracing::info!("Received Ctrl+C, waiting for the foreground process to exit");
        })
        .context("Failed to set Ctrl+C handler")?;
        Ok(state)
    }

    /// Note an interrupt. Returns true when no child holds the foreground and
    /// the launcher should exit itself.
    pub fn record_interrupt(&self) -> bool {
        self.interrupted.store(true, Ordering::SeqCst);
        !self.foreground.load(Ordering::SeqCst)
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn set_foreground(&self, on: bool) {
        self.foreground.store(on, Ordering::SeqCst);
    }
}

/// Marks the launcher as waiting on a foreground child for the duration of each run.
pub struct ForegroundRunner<R> {
    inner: R,
    state: Arc<InterruptState>,
}

impl<R: ProcessRunner> ForegroundRunner<R> {
    pub fn new(inner: R, state: Arc<InterruptState>) -> Self {
        Self { inner, state }
    }
}

impl<R: ProcessRunner> ProcessRunner for ForegroundRunner<R> {
    fn run(&self, spec: &ProcessSpec) -> std::io::Result<ExitOutcome> {
        self.state.set_foreground(true);
        let result = self.inner.run(spec);
        self.state.set_foreground(false);
        result
    }
}
