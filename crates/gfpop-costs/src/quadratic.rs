// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gfpop_core::Interval;

/// Relative slack applied when deciding whether a slightly negative
/// discriminant is round-off from a tangent intersection.
const DISCRIMINANT_SLACK: f64 = 1.0e-12;

/// Convex cost `a * mu^2 + b * mu + c` with `a >= 0`.
///
/// Constant pieces at `c = +inf` represent the identity element of the
/// minimum envelope; every operation lets the infinity propagate.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadraticCost {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for QuadraticCost {
    fn default() -> Self {
        Self::zero()
    }
}

impl QuadraticCost {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn constant(c: f64) -> Self {
        Self::new(0.0, 0.0, c)
    }

    pub const fn infinite() -> Self {
        Self::constant(f64::INFINITY)
    }

    pub fn is_constant(&self) -> bool {
        self.a == 0.0 && self.b == 0.0
    }

    pub fn is_infinite(&self) -> bool {
        self.c == f64::INFINITY
    }

    /// Symbolic equality on the coefficient tuple.
    ///
    /// Cost comparisons never go through computed minima; two costs are equal
    /// exactly when their coefficients are.
    pub fn same_coefficients(&self, other: &QuadraticCost) -> bool {
        self.a == other.a && self.b == other.b && self.c == other.c
    }

    pub fn eval(&self, mu: f64) -> f64 {
        debug_assert!(self.a >= 0.0, "cost curvature must be >= 0; got a={}", self.a);
        if self.is_infinite() {
            return f64::INFINITY;
        }
        (self.a * mu + self.b) * mu + self.c
    }

    /// Unconstrained minimum; `c` for constant costs.
    ///
    /// Linear costs (`a = 0, b != 0`) are unbounded on the real line and are
    /// only ever queried through [`QuadraticCost::min_on`].
    pub fn minimum(&self) -> f64 {
        if self.a > 0.0 {
            self.c - (self.b * self.b) / (4.0 * self.a)
        } else {
            self.c
        }
    }

    /// Unconstrained argmin; 0 for degenerate costs.
    pub fn argmin(&self) -> f64 {
        if self.a > 0.0 { -self.b / (2.0 * self.a) } else { 0.0 }
    }

    /// Minimum restricted to a closed interval.
    pub fn min_on(&self, interval: &Interval) -> f64 {
        if interval.is_empty() {
            return f64::INFINITY;
        }
        self.eval(self.argmin_on(interval))
    }

    /// Argmin restricted to a closed interval.
    pub fn argmin_on(&self, interval: &Interval) -> f64 {
        debug_assert!(self.a >= 0.0, "cost curvature must be >= 0; got a={}", self.a);
        if interval.is_empty() {
            return f64::NAN;
        }
        if self.a > 0.0 {
            self.argmin().clamp(interval.a(), interval.b())
        } else if self.b > 0.0 {
            interval.a()
        } else if self.b < 0.0 {
            interval.b()
        } else {
            interval.a()
        }
    }

    pub fn add(&mut self, other: &QuadraticCost) {
        self.a += other.a;
        self.b += other.b;
        self.c += other.c;
    }

    pub fn add_constant(&mut self, value: f64) {
        self.c += value;
    }

    /// Composes with a translation: the result evaluates `f(mu - delta)`.
    pub fn shift(&self, delta: f64) -> QuadraticCost {
        QuadraticCost::new(
            self.a,
            self.b - 2.0 * self.a * delta,
            (self.a * delta - self.b) * delta + self.c,
        )
    }

    /// Composes with a dilation: the result evaluates `f(mu / gamma)`.
    pub fn decay(&self, gamma: f64) -> QuadraticCost {
        QuadraticCost::new(self.a / (gamma * gamma), self.b / gamma, self.c)
    }

    /// Interval where `f <= value`, empty when the level set is empty.
    ///
    /// A discriminant that is negative only by round-off (tangent
    /// intersection) is clamped to zero so zero-measure intersections are not
    /// dropped.
    pub fn interval_inter_roots(&self, value: f64) -> Interval {
        if self.is_infinite() {
            return Interval::empty();
        }
        if self.a > 0.0 {
            let four_a = 4.0 * self.a;
            let discriminant = self.b * self.b - four_a * (self.c - value);
            if discriminant < 0.0 {
                let scale = (self.b * self.b)
                    .max((four_a * (self.c - value)).abs())
                    .max(1.0);
                if discriminant < -DISCRIMINANT_SLACK * scale {
                    return Interval::empty();
                }
                let root = -self.b / (2.0 * self.a);
                return Interval::new(root, root);
            }
            let sqrt_d = discriminant.sqrt();
            let half = 2.0 * self.a;
            return Interval::new((-self.b - sqrt_d) / half, (-self.b + sqrt_d) / half);
        }
        if self.b > 0.0 {
            return Interval::new(f64::NEG_INFINITY, (value - self.c) / self.b);
        }
        if self.b < 0.0 {
            return Interval::new((value - self.c) / self.b, f64::INFINITY);
        }
        if self.c <= value {
            Interval::new(f64::NEG_INFINITY, f64::INFINITY)
        } else {
            Interval::empty()
        }
    }
}
