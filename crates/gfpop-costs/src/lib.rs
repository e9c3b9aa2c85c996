// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod loss;
pub mod quadratic;

pub use loss::{LossKind, PointRegion};
pub use quadratic::QuadraticCost;

/// Built-in cost calculus namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = gfpop_core::crate_name();
    "gfpop-costs"
}
