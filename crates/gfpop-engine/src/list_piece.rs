// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::piece::Piece;
use crate::track::Track;
use gfpop_core::{Bound, GfpopError, Interval, WeightedPoint};
use gfpop_core::graph::{Edge, EdgeKind};
use gfpop_costs::{LossKind, PointRegion, QuadraticCost};

/// Junction continuity tolerance, relative to the junction value.
const CONTINUITY_TOL: f64 = 1.0e-9;

/// Minimum of a list together with the winning piece's provenance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ListMin {
    pub value: f64,
    pub argmin: f64,
    pub track: Track,
}

/// Result of an interval-restricted minimum search.
///
/// `clipped` is true when the winning piece's free argmin fell outside the
/// restriction, i.e. the argmin landed on a constraint endpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstrainedMin {
    pub value: f64,
    pub argmin: f64,
    pub track: Track,
    pub clipped: bool,
}

/// Ordered, contiguous, non-empty sequence of pieces covering the search
/// domain.
///
/// Every public primitive restores the list invariants: intervals are
/// disjoint, ascending and contiguous, their union is the search domain,
/// junctions between finite neighbours are continuous, and each piece's
/// track position equals its ordinal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ListPiece {
    pieces: Vec<Piece>,
}

/// Accumulates envelope output, skipping zero-width regions and fusing
/// adjacent regions that carry the same cost and provenance.
struct ListBuilder {
    pieces: Vec<Piece>,
}

impl ListBuilder {
    fn new() -> Self {
        Self { pieces: vec![] }
    }

    fn push(&mut self, track: Track, interval: Interval, cost: QuadraticCost) {
        if interval.is_empty() || interval.width() <= 0.0 {
            return;
        }
        if let Some(last) = self.pieces.last_mut() {
            let same_provenance = last.track.label == track.label
                && last.track.state == track.state
                && last.track.parent_state == track.parent_state;
            if same_provenance && last.cost.same_coefficients(&cost) {
                last.interval.set_b(interval.b());
                return;
            }
        }
        self.pieces.push(Piece::new(track, interval, cost));
    }

    fn finish(self) -> Vec<Piece> {
        self.pieces
    }
}

fn plateau(value: f64) -> QuadraticCost {
    if value == f64::INFINITY {
        QuadraticCost::infinite()
    } else {
        QuadraticCost::constant(value)
    }
}

impl ListPiece {
    /// Single zero-cost piece over the search domain.
    pub fn uniform_zero(bound: &Bound, track: Track) -> Self {
        Self {
            pieces: vec![Piece::new(track, bound.as_interval(), QuadraticCost::zero())],
        }
    }

    /// Single infinite piece over the search domain: the identity element of
    /// the minimum envelope.
    pub fn infinite(bound: &Bound, track: Track) -> Self {
        Self {
            pieces: vec![Piece::new(track, bound.as_interval(), QuadraticCost::infinite())],
        }
    }

    /// Single constant piece over the search domain.
    pub fn constant(bound: &Bound, track: Track, value: f64) -> Self {
        Self {
            pieces: vec![Piece::new(track, bound.as_interval(), plateau(value))],
        }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn n_pieces(&self) -> usize {
        self.pieces.len()
    }

    /// Total interval spanned by the list.
    pub fn support(&self) -> Interval {
        let first = self.pieces.first().expect("list is never empty");
        let last = self.pieces.last().expect("list is never empty");
        Interval::new(first.interval.a(), last.interval.b())
    }

    fn set_positions(&mut self) {
        for (ordinal, piece) in self.pieces.iter_mut().enumerate() {
            piece.track.position = ordinal;
        }
    }

    /// Checks the list invariants against an expected support.
    pub fn check_invariants(&self, expected_support: &Interval) -> Result<(), GfpopError> {
        if self.pieces.is_empty() {
            return Err(GfpopError::invalid_input("list has no pieces"));
        }
        let support = self.support();
        if support.a() != expected_support.a() || support.b() != expected_support.b() {
            return Err(GfpopError::invalid_input(format!(
                "list support [{}, {}] does not match expected [{}, {}]",
                support.a(),
                support.b(),
                expected_support.a(),
                expected_support.b()
            )));
        }
        for (ordinal, piece) in self.pieces.iter().enumerate() {
            if piece.interval.is_empty() || piece.interval.width() < 0.0 {
                return Err(GfpopError::invalid_input(format!(
                    "piece {ordinal} has an empty interval"
                )));
            }
            if piece.track.position != ordinal {
                return Err(GfpopError::invalid_input(format!(
                    "piece {ordinal} carries position {}",
                    piece.track.position
                )));
            }
        }
        for (ordinal, window) in self.pieces.windows(2).enumerate() {
            let junction = window[0].interval.b();
            if junction != window[1].interval.a() {
                return Err(GfpopError::invalid_input(format!(
                    "pieces {ordinal} and {} are not contiguous: {} vs {}",
                    ordinal + 1,
                    junction,
                    window[1].interval.a()
                )));
            }
            let left = window[0].cost.eval(junction);
            let right = window[1].cost.eval(junction);
            if left.is_finite() && right.is_finite() {
                let tol = CONTINUITY_TOL * left.abs().max(right.abs()).max(1.0);
                if (left - right).abs() > tol {
                    return Err(GfpopError::numerical_issue(format!(
                        "junction discontinuity at mu={junction}: {left} vs {right}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Collapses the list to a single infinite piece over its support.
    pub fn set_to_infinity(&mut self) {
        let support = self.support();
        self.pieces = vec![Piece::new(
            Track::default(),
            support,
            QuadraticCost::infinite(),
        )];
    }

    /// Truncates or pads the list so its support equals `target`.
    ///
    /// Regions outside the original support are filled with infinite pieces.
    pub fn set_new_bounds(&mut self, target: Interval) {
        let mut clipped: Vec<Piece> = vec![];
        for piece in &self.pieces {
            let interval = piece.interval.intersect(&target);
            if interval.is_empty() || interval.width() <= 0.0 {
                continue;
            }
            clipped.push(Piece::new(piece.track, interval, piece.cost));
        }

        if clipped.is_empty() {
            clipped.push(Piece::new(
                Track::default(),
                target,
                QuadraticCost::infinite(),
            ));
        } else {
            let head_a = clipped[0].interval.a();
            if head_a > target.a() {
                let track = clipped[0].track;
                clipped.insert(
                    0,
                    Piece::new(
                        track,
                        Interval::new(target.a(), head_a),
                        QuadraticCost::infinite(),
                    ),
                );
            }
            let tail_b = clipped.last().expect("non-empty").interval.b();
            if tail_b < target.b() {
                let track = clipped.last().expect("non-empty").track;
                clipped.push(Piece::new(
                    track,
                    Interval::new(tail_b, target.b()),
                    QuadraticCost::infinite(),
                ));
            }
        }

        self.pieces = clipped;
        self.set_positions();
    }

    /// Replaces the region below `x` with a single infinite piece, keeping
    /// the support unchanged. Used by the isotonic driver to shrink the live
    /// domain from the left.
    pub fn set_infinite_below(&mut self, x: f64) {
        let support = self.support();
        if x <= support.a() {
            return;
        }
        if x >= support.b() {
            self.set_to_infinity();
            self.set_positions();
            return;
        }
        self.split_at(x);
        for piece in &mut self.pieces {
            if piece.interval.b() <= x {
                piece.cost = QuadraticCost::infinite();
            }
        }
        self.fuse_infinite_runs();
        self.set_positions();
    }

    fn fuse_infinite_runs(&mut self) {
        let mut fused: Vec<Piece> = vec![];
        for piece in self.pieces.drain(..) {
            if let Some(last) = fused.last_mut() {
                if last.cost.is_infinite() && piece.cost.is_infinite() {
                    last.interval.set_b(piece.interval.b());
                    continue;
                }
            }
            fused.push(piece);
        }
        self.pieces = fused;
    }

    /// Splits the piece containing `x` in two at `x` (no-op on boundaries).
    fn split_at(&mut self, x: f64) {
        let support = self.support();
        if x <= support.a() || x >= support.b() {
            return;
        }
        for idx in 0..self.pieces.len() {
            let interval = self.pieces[idx].interval;
            if interval.a() < x && x < interval.b() {
                let mut right = self.pieces[idx].clone();
                right.interval = Interval::new(x, interval.b());
                self.pieces[idx].interval = Interval::new(interval.a(), x);
                self.pieces.insert(idx + 1, right);
                break;
            }
        }
    }

    /// Adds a constant (an edge penalty) to every piece.
    pub fn add_constant(&mut self, value: f64) {
        for piece in &mut self.pieces {
            piece.cost.add_constant(value);
        }
    }

    /// Folds a data point into the list under the given loss kind.
    ///
    /// Robust kinds first split the list at the point's knots so each piece
    /// lies entirely in one region of the loss.
    pub fn add_point(&mut self, pt: &WeightedPoint, kind: &LossKind) {
        match kind.knots(pt) {
            None => {
                let contribution = kind.contribution(pt, PointRegion::Center);
                for piece in &mut self.pieces {
                    piece.cost.add(&contribution);
                }
            }
            Some((lo, hi)) => {
                self.split_at(lo);
                self.split_at(hi);
                for piece in &mut self.pieces {
                    let mid = 0.5 * (piece.interval.a() + piece.interval.b());
                    let region = if mid < lo {
                        PointRegion::Left
                    } else if mid > hi {
                        PointRegion::Right
                    } else {
                        PointRegion::Center
                    };
                    piece.cost.add(&kind.contribution(pt, region));
                }
            }
        }
        self.set_positions();
    }

    /// Translates the list by `delta` (`f(mu) -> f(mu - delta)`), keeping the
    /// support fixed by padding the uncovered side with infinity.
    pub fn shift(&mut self, delta: f64) {
        if delta == 0.0 {
            return;
        }
        let support = self.support();
        for piece in &mut self.pieces {
            piece.interval = Interval::new(piece.interval.a() + delta, piece.interval.b() + delta);
            piece.cost = piece.cost.shift(delta);
        }
        self.set_new_bounds(support);
    }

    /// Applies an exponential decay step (`f(mu) -> f(mu / gamma)`), keeping
    /// the support fixed.
    pub fn exp_decay(&mut self, gamma: f64) {
        if gamma == 1.0 {
            return;
        }
        let support = self.support();
        for piece in &mut self.pieces {
            piece.interval = Interval::new(gamma * piece.interval.a(), gamma * piece.interval.b());
            piece.cost = piece.cost.decay(gamma);
        }
        self.set_new_bounds(support);
    }

    /// Mirror image around zero; an involution used to derive the
    /// right-to-left running minimum from the left-to-right one.
    fn reflected(&self) -> ListPiece {
        let mut pieces: Vec<Piece> = self
            .pieces
            .iter()
            .rev()
            .map(|piece| {
                Piece::new(
                    piece.track,
                    Interval::new(-piece.interval.b(), -piece.interval.a()),
                    QuadraticCost::new(piece.cost.a, -piece.cost.b, piece.cost.c),
                )
            })
            .collect();
        for (ordinal, piece) in pieces.iter_mut().enumerate() {
            piece.track.position = ordinal;
        }
        ListPiece { pieces }
    }

    /// Left-to-right running minimum: the non-increasing envelope
    /// `h(mu) = min over nu <= mu of f(nu)`.
    pub fn running_min_left(&self) -> ListPiece {
        let mut out = ListBuilder::new();
        let mut running_value = f64::INFINITY;
        let mut running_track = self.pieces[0].track;

        for piece in &self.pieces {
            let interval = piece.interval;
            let piece_min = piece.min_on_interval();

            if !(piece_min < running_value) {
                out.push(running_track, interval, plateau(running_value));
                continue;
            }

            let entry = piece.cost.eval(interval.a());
            let continuity = entry == running_value;
            let region = piece.interval_min_less(interval.a(), running_value, !continuity);

            if region.is_empty() {
                // The piece undercuts the plateau but has no decreasing
                // branch here: it enters at its own minimum.
                out.push(piece.track, interval, plateau(piece_min));
            } else {
                out.push(
                    running_track,
                    Interval::new(interval.a(), region.a()),
                    plateau(running_value),
                );
                out.push(
                    piece.track,
                    Interval::new(region.a(), region.b()),
                    piece.cost,
                );
                out.push(
                    piece.track,
                    Interval::new(region.b(), interval.b()),
                    plateau(piece_min),
                );
            }

            running_value = piece_min;
            running_track = piece.track;
        }

        let mut list = ListPiece {
            pieces: out.finish(),
        };
        list.set_positions();
        list
    }

    /// Right-to-left running minimum: the non-decreasing envelope
    /// `h(mu) = min over nu >= mu of f(nu)`.
    pub fn running_min_right(&self) -> ListPiece {
        self.reflected().running_min_left().reflected()
    }

    /// Running minimum stamped for a jump recorded at `new_label`; the
    /// isotonic operator (named for its non-increasing output).
    pub fn operator_down(&self, new_label: usize, state: usize, parent_state: usize) -> ListPiece {
        let mut list = self.running_min_left();
        list.stamp_tracks(new_label, state, parent_state);
        list
    }

    /// Mirror operator with non-decreasing output.
    pub fn operator_up(&self, new_label: usize, state: usize, parent_state: usize) -> ListPiece {
        let mut list = self.running_min_right();
        list.stamp_tracks(new_label, state, parent_state);
        list
    }

    fn stamp_tracks(&mut self, label: usize, state: usize, parent_state: usize) {
        for (ordinal, piece) in self.pieces.iter_mut().enumerate() {
            piece.track = Track::new(label, state, ordinal, parent_state);
        }
    }

    /// Transports the list across an edge: the cost of ending a segment in
    /// the edge's target state by taking that edge. The edge penalty is
    /// folded in here, once.
    pub fn edge_constraint(&self, edge: &Edge, new_label: usize) -> ListPiece {
        let mut out = match edge.kind {
            EdgeKind::Null => {
                let mut list = self.clone();
                if edge.delta != 0.0 {
                    list.shift(-edge.delta);
                }
                if edge.decay != 1.0 {
                    list.exp_decay(edge.decay);
                }
                list
            }
            EdgeKind::Up => {
                let mut list = self.running_min_left();
                list.shift(edge.delta);
                list.stamp_tracks(new_label, edge.target, edge.source);
                list
            }
            EdgeKind::Down => {
                let mut list = self.running_min_right();
                list.shift(-edge.delta);
                list.stamp_tracks(new_label, edge.target, edge.source);
                list
            }
            EdgeKind::Abs => {
                let mut up = self.running_min_left();
                up.shift(edge.delta);
                up.stamp_tracks(new_label, edge.target, edge.source);
                let mut down = self.running_min_right();
                down.shift(-edge.delta);
                down.stamp_tracks(new_label, edge.target, edge.source);
                up.min_function(&down)
            }
            EdgeKind::Std => {
                let minimum = self.global_min();
                ListPiece {
                    pieces: vec![Piece::new(
                        Track::new(new_label, edge.target, 0, edge.source),
                        self.support(),
                        plateau(minimum.value),
                    )],
                }
            }
        };
        out.add_constant(edge.beta);
        out
    }

    /// Pointwise minimum envelope of two lists over the same support.
    ///
    /// Equal minima resolve to the piece with the smaller label, then the
    /// smaller state, then the receiver.
    pub fn min_function(&self, other: &ListPiece) -> ListPiece {
        debug_assert_eq!(
            self.support(),
            other.support(),
            "envelope operands must share a support"
        );

        let mut out = ListBuilder::new();
        let mut ia = 0;
        let mut ib = 0;
        let mut x = self.support().a();

        while ia < self.pieces.len() && ib < other.pieces.len() {
            let pa = &self.pieces[ia];
            let pb = &other.pieces[ib];
            let hi = pa.interval.b().min(pb.interval.b());

            if hi > x {
                emit_min_region(&mut out, pa, pb, x, hi);
            }

            if pa.interval.b() <= hi {
                ia += 1;
            }
            if pb.interval.b() <= hi {
                ib += 1;
            }
            x = hi;
        }

        let mut list = ListPiece {
            pieces: out.finish(),
        };
        list.set_positions();
        list
    }

    /// Minimum over the whole list with deterministic tie-breaking.
    pub fn global_min(&self) -> ListMin {
        let full = Interval::new(f64::NEG_INFINITY, f64::INFINITY);
        let found = self
            .min_in_interval(&full)
            .expect("non-empty list always has a minimum");
        ListMin {
            value: found.value,
            argmin: found.argmin,
            track: found.track,
        }
    }

    /// Minimum restricted to `constraint`; `None` when the constraint misses
    /// the support entirely.
    pub fn min_in_interval(&self, constraint: &Interval) -> Option<ConstrainedMin> {
        let mut best: Option<ConstrainedMin> = None;
        for piece in &self.pieces {
            let restricted = piece.interval.intersect(constraint);
            if restricted.is_empty() {
                continue;
            }
            let value = piece.cost.min_on(&restricted);
            let argmin = piece.cost.argmin_on(&restricted);
            let clipped = !restricted.contains(piece.argmin_on_interval());
            let candidate = ConstrainedMin {
                value,
                argmin,
                track: piece.track,
                clipped,
            };
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if candidate.value < current.value
                        || (candidate.value == current.value
                            && candidate.track.wins_tie_over(&current.track))
                    {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
        best
    }

    /// Argmin restricted to `mu <= cap`, used by the isotonic driver to move
    /// the live domain's left edge. Falls back to the current left edge when
    /// the capped region carries no finite cost.
    pub fn new_bound(&self, cap: f64) -> f64 {
        match self.min_in_interval(&Interval::new(f64::NEG_INFINITY, cap)) {
            Some(found) if found.value.is_finite() => found.argmin,
            _ => self.support().a(),
        }
    }
}

/// Emits the pointwise minimum of two pieces over `[lo, hi]`.
fn emit_min_region(out: &mut ListBuilder, pa: &Piece, pb: &Piece, lo: f64, hi: f64) {
    let region = Interval::new(lo, hi);
    let qa = &pa.cost;
    let qb = &pb.cost;

    // Infinite costs never produce crossings; decide the whole region.
    if qa.is_infinite() || qb.is_infinite() {
        let winner = if qa.is_infinite() && qb.is_infinite() {
            tie_break(pa, pb)
        } else if qa.is_infinite() {
            pb
        } else {
            pa
        };
        out.push(winner.track, region, winner.cost);
        return;
    }

    if qa.same_coefficients(qb) {
        let winner = tie_break(pa, pb);
        out.push(winner.track, region, winner.cost);
        return;
    }

    // Sign analysis of the difference qa - qb: a general quadratic with at
    // most two real roots, so at most three alternating regions.
    let da = qa.a - qb.a;
    let db = qa.b - qb.b;
    let dc = qa.c - qb.c;

    let mut cuts: Vec<f64> = vec![];
    if da == 0.0 {
        if db != 0.0 {
            cuts.push(-dc / db);
        }
    } else {
        let discriminant = db * db - 4.0 * da * dc;
        if discriminant > 0.0 {
            let sqrt_d = discriminant.sqrt();
            let r1 = (-db - sqrt_d) / (2.0 * da);
            let r2 = (-db + sqrt_d) / (2.0 * da);
            cuts.push(r1.min(r2));
            cuts.push(r1.max(r2));
        }
    }
    cuts.retain(|root| lo < *root && *root < hi);
    cuts.sort_by(|left, right| left.partial_cmp(right).expect("roots are finite"));

    let mut edges = Vec::with_capacity(cuts.len() + 2);
    edges.push(lo);
    edges.extend(cuts);
    edges.push(hi);

    for window in edges.windows(2) {
        let (u, v) = (window[0], window[1]);
        if v <= u {
            continue;
        }
        let mid = 0.5 * (u + v);
        let value_a = qa.eval(mid);
        let value_b = qb.eval(mid);
        let winner = if value_a < value_b {
            pa
        } else if value_b < value_a {
            pb
        } else {
            tie_break(pa, pb)
        };
        out.push(winner.track, Interval::new(u, v), winner.cost);
    }
}

fn tie_break<'a>(pa: &'a Piece, pb: &'a Piece) -> &'a Piece {
    if pb.track.wins_tie_over(&pa.track) {
        pb
    } else {
        pa
    }
}
