// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Receives coarse completion fractions while a driver walks the signal.
///
/// Drivers report at most once per t-iteration of the forward recursion; the
/// fraction is clamped to `[0.0, 1.0]` by the execution context and reaches
/// 1.0 when the forward pass hands over to backtracking.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, fraction: f32);
}

/// Receives named scalar measurements at the end of a driver run, such as
/// runtimes and live piece counts under keys like
/// `engine.graph_complex.pieces_max_live`.
pub trait TelemetrySink: Send + Sync {
    fn record_scalar(&self, key: &'static str, value: f64);
}

/// Progress sink that discards every report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_progress(&self, _fraction: f32) {}
}

/// Telemetry sink that discards every scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record_scalar(&self, _key: &'static str, _value: f64) {}
}

#[cfg(test)]
mod tests {
    use super::{NoopProgressSink, NoopTelemetrySink, ProgressSink, TelemetrySink};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn noop_progress_sink_swallows_a_full_forward_pass() {
        let sink = NoopProgressSink;
        let n = 16;
        for t in 0..=n {
            sink.on_progress(t as f32 / n as f32);
        }
    }

    #[test]
    fn noop_telemetry_sink_swallows_driver_scalars() {
        let sink = NoopTelemetrySink;
        sink.record_scalar("engine.graph_std.runtime_ms", 4.0);
        sink.record_scalar("engine.graph_complex.pieces_max_live", 23.0);
        sink.record_scalar("engine.graph_complex.pieces_total", 1_180.0);
    }

    #[test]
    fn sinks_are_usable_behind_trait_objects() {
        struct CountingSink {
            calls: AtomicUsize,
        }

        impl ProgressSink for CountingSink {
            fn on_progress(&self, _fraction: f32) {
                self.calls.fetch_add(1, Ordering::SeqCst);
            }
        }

        impl TelemetrySink for CountingSink {
            fn record_scalar(&self, _key: &'static str, _value: f64) {
                self.calls.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counting = CountingSink {
            calls: AtomicUsize::new(0),
        };
        let progress: &dyn ProgressSink = &counting;
        let telemetry: &dyn TelemetrySink = &counting;

        progress.on_progress(0.5);
        telemetry.record_scalar("engine.graph_isotonic.runtime_ms", 2.0);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }
}
