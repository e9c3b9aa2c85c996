// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{Diagnostics, GfpopError};

/// Validates the changepoint conventions used by segmentation drivers.
///
/// Changepoints are 1-indexed segment end positions in forward order; the
/// final element is always `n`.
pub fn validate_changepoints(n: usize, changepoints: &[usize]) -> Result<(), GfpopError> {
    if changepoints.is_empty() {
        return Err(GfpopError::invalid_input(format!(
            "changepoints must be non-empty and include n={n} as the final element"
        )));
    }

    let mut prev: Option<usize> = None;
    for (idx, &cp) in changepoints.iter().enumerate() {
        if cp == 0 {
            return Err(GfpopError::invalid_input(format!(
                "changepoints[{idx}] must be >= 1; got 0"
            )));
        }
        if cp > n {
            return Err(GfpopError::invalid_input(format!(
                "changepoints[{idx}] must be <= n; got changepoint={cp}, n={n}"
            )));
        }
        if let Some(prev_cp) = prev {
            if cp <= prev_cp {
                return Err(GfpopError::invalid_input(format!(
                    "changepoints must be strictly increasing: changepoints[{idx}]={cp}, previous={prev_cp}"
                )));
            }
        }
        prev = Some(cp);
    }

    let last = *changepoints.last().expect("checked non-empty above");
    if last != n {
        return Err(GfpopError::invalid_input(format!(
            "changepoints must end at n: last={last}, n={n}"
        )));
    }

    Ok(())
}

/// Structured result returned by segmentation drivers.
///
/// `parameters[i]` and `states[i]` describe the segment ending at
/// `changepoints[i]`; `forced[i]` flags the transition into segment `i + 1`
/// whose recovered parameter had to be clamped. An infeasible run carries
/// empty sequences and `global_cost = +inf`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Segmentation {
    pub changepoints: Vec<usize>,
    pub parameters: Vec<f64>,
    pub states: Vec<usize>,
    pub forced: Vec<bool>,
    pub n: usize,
    pub global_cost: f64,
    pub diagnostics: Diagnostics,
}

impl Segmentation {
    /// Constructs a feasible result and checks cross-field consistency.
    pub fn new(
        n: usize,
        changepoints: Vec<usize>,
        parameters: Vec<f64>,
        states: Vec<usize>,
        forced: Vec<bool>,
        global_cost: f64,
        diagnostics: Diagnostics,
    ) -> Result<Self, GfpopError> {
        validate_changepoints(n, &changepoints)?;

        if parameters.len() != changepoints.len() {
            return Err(GfpopError::invalid_input(format!(
                "parameters length must equal changepoints length; got parameters={}, changepoints={}",
                parameters.len(),
                changepoints.len()
            )));
        }
        if states.len() != changepoints.len() {
            return Err(GfpopError::invalid_input(format!(
                "states length must equal changepoints length; got states={}, changepoints={}",
                states.len(),
                changepoints.len()
            )));
        }
        if forced.len() != changepoints.len().saturating_sub(1) {
            return Err(GfpopError::invalid_input(format!(
                "forced length must equal transition count; got forced={}, transitions={}",
                forced.len(),
                changepoints.len().saturating_sub(1)
            )));
        }
        if global_cost.is_nan() {
            return Err(GfpopError::numerical_issue(
                "global cost must not be NaN".to_string(),
            ));
        }

        Ok(Self {
            changepoints,
            parameters,
            states,
            forced,
            n,
            global_cost,
            diagnostics,
        })
    }

    /// Constructs the infeasible-run result (`global_cost = +inf`).
    pub fn infeasible(n: usize, diagnostics: Diagnostics) -> Self {
        Self {
            changepoints: vec![],
            parameters: vec![],
            states: vec![],
            forced: vec![],
            n,
            global_cost: f64::INFINITY,
            diagnostics,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.global_cost.is_finite()
    }

    /// Number of transitions in the recovered segmentation.
    pub fn n_transitions(&self) -> usize {
        self.changepoints.len().saturating_sub(1)
    }
}
