// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GfpopError;
use crate::control::CancelToken;
use crate::observability::{ProgressSink, TelemetrySink};

/// Unified execution context passed through driver calls.
///
/// The recursion itself is strictly sequential; the context only carries the
/// hooks a host may attach around it (cancellation between t-iterations,
/// progress reporting, scalar telemetry).
#[derive(Default)]
pub struct ExecutionContext<'a> {
    pub cancel: Option<&'a CancelToken>,
    pub progress: Option<&'a dyn ProgressSink>,
    pub telemetry: Option<&'a dyn TelemetrySink>,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context with no optional hooks attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the optional cancellation token.
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets an optional progress sink.
    pub fn with_progress_sink(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Sets an optional telemetry sink.
    pub fn with_telemetry_sink(mut self, telemetry: &'a dyn TelemetrySink) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Returns true when cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Returns a cancelled error when cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<(), GfpopError> {
        if self.is_cancelled() {
            return Err(GfpopError::cancelled());
        }
        Ok(())
    }

    /// Checks cancellation every `every` iterations.
    ///
    /// When `every` is zero, it is treated as one (always poll).
    pub fn check_cancelled_every(&self, iteration: usize, every: usize) -> Result<(), GfpopError> {
        let every = every.max(1);
        if iteration % every != 0 {
            return Ok(());
        }
        self.check_cancelled()
    }

    /// Reports a progress fraction when a sink is attached.
    pub fn report_progress(&self, fraction: f32) {
        if let Some(progress) = self.progress {
            progress.on_progress(fraction.clamp(0.0, 1.0));
        }
    }

    /// Records a scalar when a telemetry sink is attached.
    pub fn record_scalar(&self, key: &'static str, value: f64) {
        if let Some(telemetry) = self.telemetry {
            telemetry.record_scalar(key, value);
        }
    }
}
