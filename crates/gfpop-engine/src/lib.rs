// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod list_piece;
pub mod omega;
pub mod pava;
pub mod piece;
#[cfg(feature = "serde")]
pub mod schema_migration;
pub mod track;

pub use list_piece::{ConstrainedMin, ListMin, ListPiece};
pub use omega::{Omega, OmegaConfig};
pub use pava::{PavaFit, pava_isotonic};
pub use piece::Piece;
#[cfg(feature = "serde")]
pub use schema_migration::{CURRENT_SCHEMA_VERSION, OmegaConfigWire, validate_schema_version};
pub use track::Track;

/// Segmentation engine namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = (gfpop_core::crate_name(), gfpop_costs::crate_name());
    "gfpop-engine"
}
