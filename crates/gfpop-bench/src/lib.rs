// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Benchmark crate namespace placeholder; all content lives in `benches/`.
pub fn crate_name() -> &'static str {
    "gfpop-bench"
}
