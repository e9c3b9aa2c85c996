// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gfpop_core::WeightedSignal;

/// Blocks of a weighted isotonic (non-decreasing) least-squares fit.
#[derive(Clone, Debug, PartialEq)]
pub struct PavaFit {
    /// 1-indexed end position of each block, ascending; last is n.
    pub ends: Vec<usize>,
    /// Fitted value of each block, non-decreasing.
    pub values: Vec<f64>,
    /// Weighted sum of squared residuals of the fit.
    pub cost: f64,
}

/// Pool-adjacent-violators for weighted isotonic least squares.
///
/// Forward scan: a strictly larger observation opens a new block, anything
/// else merges into the last block, then violating blocks pool backwards
/// under their weighted mean.
pub fn pava_isotonic(signal: &WeightedSignal) -> PavaFit {
    let first = signal.point(0);
    let mut values = vec![first.y];
    let mut weights = vec![first.w];
    let mut ends = vec![1usize];

    for t in 1..signal.n() {
        let pt = signal.point(t);
        let last = values.len() - 1;
        if values[last] < pt.y {
            values.push(pt.y);
            weights.push(pt.w);
            ends.push(t + 1);
        } else {
            values[last] = (weights[last] * values[last] + pt.w * pt.y) / (weights[last] + pt.w);
            weights[last] += pt.w;
            ends[last] = t + 1;

            while values.len() > 1 && values[values.len() - 2] > values[values.len() - 1] {
                let last = values.len() - 1;
                let pooled_weight = weights[last - 1] + weights[last];
                values[last - 1] =
                    (weights[last] * values[last] + weights[last - 1] * values[last - 1])
                        / pooled_weight;
                weights[last - 1] = pooled_weight;
                ends[last - 1] = ends[last];
                values.pop();
                weights.pop();
                ends.pop();
            }
        }
    }

    let mut cost = 0.0;
    let mut start = 0usize;
    for (block, &end) in ends.iter().enumerate() {
        for t in start..end {
            let pt = signal.point(t);
            let residual = values[block] - pt.y;
            cost += pt.w * residual * residual;
        }
        start = end;
    }

    PavaFit { ends, values, cost }
}
