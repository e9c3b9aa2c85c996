// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GfpopError;
use crate::interval::Interval;

/// Search domain `[m, M]` for the segment parameter.
///
/// `is_constrained` records whether the caller supplied the bounds as a hard
/// restriction; drivers use it to decide when a clamped argmin must be
/// reported as forced.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound {
    pub m: f64,
    pub big_m: f64,
    pub is_constrained: bool,
}

impl Default for Bound {
    fn default() -> Self {
        Self {
            m: -1.0e5,
            big_m: 1.0e5,
            is_constrained: false,
        }
    }
}

impl Bound {
    pub fn new(m: f64, big_m: f64, is_constrained: bool) -> Self {
        Self {
            m,
            big_m,
            is_constrained,
        }
    }

    /// Rejects inverted or non-finite domains.
    pub fn validate(&self) -> Result<(), GfpopError> {
        if !self.m.is_finite() || !self.big_m.is_finite() {
            return Err(GfpopError::invalid_input(format!(
                "bounds must be finite; got m={}, M={}",
                self.m, self.big_m
            )));
        }
        if self.big_m < self.m {
            return Err(GfpopError::invalid_input(format!(
                "bounds are inverted: M={} < m={}",
                self.big_m, self.m
            )));
        }
        Ok(())
    }

    pub fn as_interval(&self) -> Interval {
        Interval::new(self.m, self.big_m)
    }

    /// Clamps a parameter into the domain, reporting whether clipping occurred.
    pub fn clamp(&self, mu: f64) -> (f64, bool) {
        if mu < self.m {
            (self.m, true)
        } else if mu > self.big_m {
            (self.big_m, true)
        } else {
            (mu, false)
        }
    }
}
