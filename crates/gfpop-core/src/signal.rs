// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GfpopError;

/// Immutable weighted observation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedPoint {
    pub y: f64,
    pub w: f64,
}

impl WeightedPoint {
    pub const fn new(y: f64, w: f64) -> Self {
        Self { y, w }
    }
}

/// Ordered sequence of weighted observations with length known up front.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedSignal {
    points: Vec<WeightedPoint>,
}

impl WeightedSignal {
    /// Builds a signal from explicit points, validating every observation.
    pub fn from_points(points: Vec<WeightedPoint>) -> Result<Self, GfpopError> {
        if points.is_empty() {
            return Err(GfpopError::invalid_input(
                "signal must contain at least one observation; got n=0",
            ));
        }
        for (t, pt) in points.iter().enumerate() {
            if !pt.y.is_finite() {
                return Err(GfpopError::invalid_input(format!(
                    "signal value must be finite; got y={} at t={t}",
                    pt.y
                )));
            }
            if !pt.w.is_finite() || pt.w <= 0.0 {
                return Err(GfpopError::invalid_input(format!(
                    "signal weight must be finite and > 0; got w={} at t={t}",
                    pt.w
                )));
            }
        }
        Ok(Self { points })
    }

    /// Builds a unit-weight signal from raw values.
    pub fn from_values(values: &[f64]) -> Result<Self, GfpopError> {
        Self::from_points(values.iter().map(|&y| WeightedPoint::new(y, 1.0)).collect())
    }

    /// Builds a signal from parallel value and weight slices.
    pub fn from_values_weights(values: &[f64], weights: &[f64]) -> Result<Self, GfpopError> {
        if values.len() != weights.len() {
            return Err(GfpopError::invalid_input(format!(
                "values and weights must have equal length; got values={}, weights={}",
                values.len(),
                weights.len()
            )));
        }
        Self::from_points(
            values
                .iter()
                .zip(weights.iter())
                .map(|(&y, &w)| WeightedPoint::new(y, w))
                .collect(),
        )
    }

    pub fn n(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, t: usize) -> WeightedPoint {
        self.points[t]
    }

    pub fn points(&self) -> &[WeightedPoint] {
        &self.points
    }
}
