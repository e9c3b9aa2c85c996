// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod bound;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod execution_context;
pub mod graph;
pub mod interval;
pub mod observability;
pub mod results;
pub mod signal;

pub use bound::Bound;
pub use control::CancelToken;
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics, PieceStats};
pub use error::GfpopError;
pub use execution_context::ExecutionContext;
pub use graph::{Edge, EdgeKind, Graph, GraphShape};
pub use interval::Interval;
pub use observability::{NoopProgressSink, NoopTelemetrySink, ProgressSink, TelemetrySink};
pub use results::{Segmentation, validate_changepoints};
pub use signal::{WeightedPoint, WeightedSignal};

/// Core shared types and traits for gfpop-rs.
pub fn crate_name() -> &'static str {
    "gfpop-core"
}
