// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::track::Track;
use gfpop_core::Interval;
use gfpop_costs::QuadraticCost;

/// One node of a piecewise cost: a convex cost restricted to an interval,
/// plus the provenance track the backward pass reads.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Piece {
    pub track: Track,
    pub interval: Interval,
    pub cost: QuadraticCost,
}

impl Piece {
    pub fn new(track: Track, interval: Interval, cost: QuadraticCost) -> Self {
        Self {
            track,
            interval,
            cost,
        }
    }

    /// Minimum of the cost restricted to this piece's interval.
    pub fn min_on_interval(&self) -> f64 {
        self.cost.min_on(&self.interval)
    }

    /// Argmin of the cost restricted to this piece's interval.
    pub fn argmin_on_interval(&self) -> f64 {
        self.cost.argmin_on(&self.interval)
    }

    /// Subinterval of this piece where the cost runs below `current_value`,
    /// restricted to the decreasing branch (it ends at the piece argmin).
    ///
    /// `current_is_constant` distinguishes a true plateau (roots must be
    /// solved) from the continuity case where the running value equals the
    /// cost at `left_bound`; the latter skips root solving, which would only
    /// reintroduce round-off at a junction that is exact by construction.
    pub fn interval_min_less(
        &self,
        left_bound: f64,
        current_value: f64,
        current_is_constant: bool,
    ) -> Interval {
        let mini = self.min_on_interval();
        if current_value <= mini {
            return Interval::empty();
        }

        let argmin = self.argmin_on_interval();
        if left_bound >= argmin {
            return Interval::empty();
        }

        if current_is_constant {
            let roots = self.cost.interval_inter_roots(current_value);
            if roots.is_empty() {
                return Interval::empty();
            }
            Interval::new(roots.a().max(left_bound), argmin)
        } else {
            Interval::new(left_bound, argmin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Piece;
    use crate::track::Track;
    use gfpop_core::Interval;
    use gfpop_costs::QuadraticCost;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual}, |diff|={diff}, tol={tol}"
        );
    }

    fn parabola_piece(interval: Interval) -> Piece {
        // (mu - 2)^2 + 1
        Piece::new(
            Track::origin(0),
            interval,
            QuadraticCost::new(1.0, -4.0, 5.0),
        )
    }

    #[test]
    fn interval_restricted_min_and_argmin() {
        let piece = parabola_piece(Interval::new(0.0, 5.0));
        assert_close(piece.min_on_interval(), 1.0, 1e-12);
        assert_close(piece.argmin_on_interval(), 2.0, 1e-12);

        let clipped = parabola_piece(Interval::new(3.0, 5.0));
        assert_close(clipped.min_on_interval(), 2.0, 1e-12);
        assert_close(clipped.argmin_on_interval(), 3.0, 1e-12);
    }

    #[test]
    fn interval_min_less_empty_when_value_at_or_below_min() {
        let piece = parabola_piece(Interval::new(0.0, 5.0));
        assert!(piece.interval_min_less(0.0, 1.0, true).is_empty());
        assert!(piece.interval_min_less(0.0, 0.5, true).is_empty());
    }

    #[test]
    fn interval_min_less_empty_when_left_bound_past_argmin() {
        let piece = parabola_piece(Interval::new(0.0, 5.0));
        assert!(piece.interval_min_less(2.0, 3.0, true).is_empty());
        assert!(piece.interval_min_less(4.0, 3.0, true).is_empty());
    }

    #[test]
    fn interval_min_less_solves_roots_against_a_plateau() {
        let piece = parabola_piece(Interval::new(0.0, 5.0));
        // (mu - 2)^2 + 1 < 2  <=>  mu in (1, 3); decreasing branch ends at 2.
        let region = piece.interval_min_less(0.0, 2.0, true);
        assert_close(region.a(), 1.0, 1e-12);
        assert_close(region.b(), 2.0, 1e-12);
    }

    #[test]
    fn interval_min_less_clips_root_to_left_bound() {
        let piece = parabola_piece(Interval::new(0.0, 5.0));
        let region = piece.interval_min_less(1.5, 2.0, true);
        assert_close(region.a(), 1.5, 1e-12);
        assert_close(region.b(), 2.0, 1e-12);
    }

    #[test]
    fn interval_min_less_continuity_branch_skips_root_solving() {
        let piece = parabola_piece(Interval::new(0.0, 5.0));
        // Entry value equals the running value: region starts exactly there.
        let region = piece.interval_min_less(0.5, piece.cost.eval(0.5), false);
        assert_close(region.a(), 0.5, 1e-12);
        assert_close(region.b(), 2.0, 1e-12);
    }
}
