// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::quadratic::QuadraticCost;
use gfpop_core::{GfpopError, WeightedPoint};

/// Per-point loss kind folded into the piecewise cost.
///
/// Every kind contributes a member of the quadratic family on each region of
/// the parameter axis, so the envelope primitives stay closed form: L2 is
/// quadratic everywhere, Huber switches to linear tails beyond the threshold
/// and the biweight to constant tails.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LossKind {
    L2,
    Huber { k: f64 },
    Biweight { k: f64 },
}

/// Position of a parameter region relative to a point's robust window
/// `[y - k, y + k]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointRegion {
    Left,
    Center,
    Right,
}

impl LossKind {
    pub fn name(&self) -> &'static str {
        match self {
            LossKind::L2 => "l2",
            LossKind::Huber { .. } => "huber",
            LossKind::Biweight { .. } => "biweight",
        }
    }

    pub fn validate(&self) -> Result<(), GfpopError> {
        match self {
            LossKind::L2 => Ok(()),
            LossKind::Huber { k } | LossKind::Biweight { k } => {
                if !k.is_finite() || *k <= 0.0 {
                    return Err(GfpopError::invalid_input(format!(
                        "robust threshold must be finite and > 0; got k={k} for kind={}",
                        self.name()
                    )));
                }
                Ok(())
            }
        }
    }

    /// Split points a piecewise cost must introduce before folding `pt`.
    pub fn knots(&self, pt: &WeightedPoint) -> Option<(f64, f64)> {
        match self {
            LossKind::L2 => None,
            LossKind::Huber { k } | LossKind::Biweight { k } => Some((pt.y - k, pt.y + k)),
        }
    }

    /// Quadratic-family contribution of `pt` on the given region.
    ///
    /// Contributions are continuous at the knots.
    pub fn contribution(&self, pt: &WeightedPoint, region: PointRegion) -> QuadraticCost {
        let w = pt.w;
        let y = pt.y;
        match (self, region) {
            (LossKind::L2, _) => QuadraticCost::new(w, -2.0 * w * y, w * y * y),
            (LossKind::Huber { .. }, PointRegion::Center)
            | (LossKind::Biweight { .. }, PointRegion::Center) => {
                QuadraticCost::new(w, -2.0 * w * y, w * y * y)
            }
            (LossKind::Huber { k }, PointRegion::Left) => {
                // w * (2k(y - mu) - k^2) for mu below y - k
                QuadraticCost::new(0.0, -2.0 * w * k, w * (2.0 * k * y - k * k))
            }
            (LossKind::Huber { k }, PointRegion::Right) => {
                // w * (2k(mu - y) - k^2) for mu above y + k
                QuadraticCost::new(0.0, 2.0 * w * k, w * (-2.0 * k * y - k * k))
            }
            (LossKind::Biweight { k }, PointRegion::Left)
            | (LossKind::Biweight { k }, PointRegion::Right) => {
                QuadraticCost::constant(w * k * k)
            }
        }
    }

    /// Direct evaluation of the per-point loss, used to reconcile the
    /// recursion's objective against a forward recomputation.
    pub fn point_loss(&self, pt: &WeightedPoint, mu: f64) -> f64 {
        let residual = pt.y - mu;
        match self {
            LossKind::L2 => pt.w * residual * residual,
            LossKind::Huber { k } => {
                if residual.abs() <= *k {
                    pt.w * residual * residual
                } else {
                    pt.w * (2.0 * k * residual.abs() - k * k)
                }
            }
            LossKind::Biweight { k } => pt.w * (residual * residual).min(k * k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LossKind, PointRegion};
    use gfpop_core::WeightedPoint;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual}, |diff|={diff}, tol={tol}"
        );
    }

    #[test]
    fn names_are_stable() {
        assert_eq!(LossKind::L2.name(), "l2");
        assert_eq!(LossKind::Huber { k: 1.0 }.name(), "huber");
        assert_eq!(LossKind::Biweight { k: 1.0 }.name(), "biweight");
    }

    #[test]
    fn validate_rejects_bad_thresholds() {
        LossKind::L2.validate().expect("l2 needs no threshold");
        LossKind::Huber { k: 2.0 }
            .validate()
            .expect("positive threshold is valid");

        let err = LossKind::Huber { k: 0.0 }
            .validate()
            .expect_err("zero threshold must fail");
        assert!(err.to_string().contains("k=0"));

        let err = LossKind::Biweight { k: f64::NAN }
            .validate()
            .expect_err("NaN threshold must fail");
        assert!(err.to_string().contains("biweight"));
    }

    #[test]
    fn l2_has_no_knots_and_quadratic_contribution() {
        let pt = WeightedPoint::new(3.0, 2.0);
        assert!(LossKind::L2.knots(&pt).is_none());

        let contribution = LossKind::L2.contribution(&pt, PointRegion::Center);
        assert_close(contribution.a, 2.0, 1e-12);
        assert_close(contribution.b, -12.0, 1e-12);
        assert_close(contribution.c, 18.0, 1e-12);
    }

    #[test]
    fn robust_knots_bracket_the_observation() {
        let pt = WeightedPoint::new(3.0, 1.0);
        let (lo, hi) = LossKind::Huber { k: 0.5 }
            .knots(&pt)
            .expect("huber has knots");
        assert_close(lo, 2.5, 1e-12);
        assert_close(hi, 3.5, 1e-12);
    }

    #[test]
    fn huber_contributions_are_continuous_at_the_knots() {
        let pt = WeightedPoint::new(1.0, 2.0);
        let kind = LossKind::Huber { k: 0.75 };
        let (lo, hi) = kind.knots(&pt).expect("huber has knots");

        let left = kind.contribution(&pt, PointRegion::Left);
        let center = kind.contribution(&pt, PointRegion::Center);
        let right = kind.contribution(&pt, PointRegion::Right);

        assert_close(left.eval(lo), center.eval(lo), 1e-12);
        assert_close(center.eval(hi), right.eval(hi), 1e-12);
        // Tails are linear.
        assert_eq!(left.a, 0.0);
        assert_eq!(right.a, 0.0);
        assert!(left.b < 0.0);
        assert!(right.b > 0.0);
    }

    #[test]
    fn biweight_contributions_are_continuous_and_flat_outside() {
        let pt = WeightedPoint::new(-2.0, 0.5);
        let kind = LossKind::Biweight { k: 1.5 };
        let (lo, hi) = kind.knots(&pt).expect("biweight has knots");

        let left = kind.contribution(&pt, PointRegion::Left);
        let center = kind.contribution(&pt, PointRegion::Center);
        let right = kind.contribution(&pt, PointRegion::Right);

        assert!(left.is_constant());
        assert!(right.is_constant());
        assert_close(left.eval(lo), center.eval(lo), 1e-12);
        assert_close(center.eval(hi), right.eval(hi), 1e-12);
        assert_close(left.c, 0.5 * 1.5 * 1.5, 1e-12);
    }

    #[test]
    fn point_loss_matches_region_contributions() {
        let pt = WeightedPoint::new(2.0, 1.5);
        for kind in [
            LossKind::L2,
            LossKind::Huber { k: 0.8 },
            LossKind::Biweight { k: 0.8 },
        ] {
            for mu in [-1.0, 1.3, 2.0, 2.7, 5.0] {
                let region = match kind.knots(&pt) {
                    None => PointRegion::Center,
                    Some((lo, hi)) => {
                        if mu < lo {
                            PointRegion::Left
                        } else if mu > hi {
                            PointRegion::Right
                        } else {
                            PointRegion::Center
                        }
                    }
                };
                let via_contribution = kind.contribution(&pt, region).eval(mu);
                assert_close(kind.point_loss(&pt, mu), via_contribution, 1e-12);
            }
        }
    }
}
