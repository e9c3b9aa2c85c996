// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::list_piece::{ConstrainedMin, ListPiece};
use crate::pava::pava_isotonic;
use crate::track::Track;
use gfpop_core::{
    Bound, Diagnostics, ExecutionContext, GfpopError, Graph, GraphShape, Interval, PieceStats,
    Segmentation, WeightedSignal,
};
use gfpop_core::graph::EdgeKind;
use gfpop_costs::LossKind;
use std::borrow::Cow;
use std::time::Instant;

const DEFAULT_CANCEL_CHECK_EVERY: usize = 1000;

/// Configuration for [`Omega`].
#[derive(Clone, Debug, PartialEq)]
pub struct OmegaConfig {
    pub cancel_check_every: usize,
}

impl Default for OmegaConfig {
    fn default() -> Self {
        Self {
            cancel_check_every: DEFAULT_CANCEL_CHECK_EVERY,
        }
    }
}

impl OmegaConfig {
    pub fn validate(&self) -> Result<(), GfpopError> {
        Ok(())
    }

    fn normalized_cancel_check_every(&self) -> usize {
        self.cancel_check_every.max(1)
    }
}

/// Counters accumulated while a driver runs.
#[derive(Default, Clone, Copy, Debug)]
struct RuntimeStats {
    pieces_max_live: usize,
    pieces_total: usize,
}

impl RuntimeStats {
    fn observe(&mut self, live: usize) {
        self.pieces_max_live = self.pieces_max_live.max(live);
        self.pieces_total += live;
    }
}

/// The functional-pruning dynamic program over a state graph.
///
/// Owns the per-(t, state) functional costs for the duration of a driver
/// call; rows stay alive until the backward pass has read them.
#[derive(Clone, Debug)]
pub struct Omega {
    graph: Graph,
    bound: Bound,
    loss: LossKind,
    config: OmegaConfig,
}

impl Omega {
    pub fn new(
        graph: Graph,
        bound: Bound,
        loss: LossKind,
        config: OmegaConfig,
    ) -> Result<Self, GfpopError> {
        bound.validate()?;
        loss.validate()?;
        config.validate()?;
        Ok(Self {
            graph,
            bound,
            loss,
            config,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn bound(&self) -> &Bound {
        &self.bound
    }

    pub fn loss(&self) -> &LossKind {
        &self.loss
    }

    pub fn config(&self) -> &OmegaConfig {
        &self.config
    }

    fn diagnostics(
        &self,
        algorithm: &'static str,
        n: usize,
        started_at: Instant,
        notes: Vec<String>,
        warnings: Vec<String>,
        stats: Option<RuntimeStats>,
    ) -> Diagnostics {
        let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        Diagnostics {
            n,
            runtime_ms: Some(runtime_ms),
            notes,
            warnings,
            algorithm: Cow::Borrowed(algorithm),
            loss: Cow::Borrowed(self.loss.name()),
            piece_stats: stats.map(|stats| PieceStats {
                pieces_max_live: stats.pieces_max_live,
                pieces_total: stats.pieces_total,
            }),
            ..Diagnostics::default()
        }
    }

    /// Under a hard (constrained) domain, an argmin landing exactly on an
    /// endpoint is a clamped vertex: for a strictly convex piece the
    /// unrestricted argmin would otherwise sit in the interior.
    fn clamped_to_constrained_domain(&self, param: f64) -> bool {
        self.bound.is_constrained && (param == self.bound.m || param == self.bound.big_m)
    }

    /// Dispatches to the driver matching the graph structure.
    pub fn segment(
        &self,
        signal: &WeightedSignal,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Segmentation, GfpopError> {
        match self.graph.shape() {
            GraphShape::Std => self.fpop1d_graph_std(signal, ctx),
            GraphShape::Isotonic => self.fpop1d_graph_isotonic(signal, ctx),
            GraphShape::Complex => self.fpop1d_graph_complex(signal, ctx),
        }
    }

    /// Pool-adjacent-violators baseline for the isotonic problem.
    pub fn pava(&self, signal: &WeightedSignal) -> Result<Segmentation, GfpopError> {
        let started_at = Instant::now();
        let fit = pava_isotonic(signal);
        let blocks = fit.ends.len();
        let diagnostics = self.diagnostics(
            "pava",
            signal.n(),
            started_at,
            vec![format!("final_objective={}, blocks={blocks}", fit.cost)],
            vec![],
            None,
        );
        Segmentation::new(
            signal.n(),
            fit.ends,
            fit.values,
            vec![0; blocks],
            vec![false; blocks.saturating_sub(1)],
            fit.cost,
            diagnostics,
        )
    }

    /// Unconstrained one-state driver: the new-segment option is a single
    /// constant piece at the running global minimum plus the penalty.
    pub fn fpop1d_graph_std(
        &self,
        signal: &WeightedSignal,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Segmentation, GfpopError> {
        if self.graph.shape() != GraphShape::Std {
            return Err(GfpopError::invalid_input(format!(
                "fpop1d_graph_std requires a one-state null+std graph; got {} states and {} edges",
                self.graph.n_states(),
                self.graph.n_edges()
            )));
        }
        let beta = self
            .graph
            .edges()
            .iter()
            .find(|edge| matches!(edge.kind, EdgeKind::Std))
            .expect("std shape has a std edge")
            .beta;

        let n = signal.n();
        let started_at = Instant::now();
        let cadence = self.config.normalized_cancel_check_every();
        let mut stats = RuntimeStats::default();

        let mut q = ListPiece::uniform_zero(&self.bound, Track::origin(0));
        let mut segment_start = Vec::with_capacity(n);
        let mut argmins = Vec::with_capacity(n);
        let mut global_cost = f64::INFINITY;

        for t in 0..n {
            ctx.check_cancelled_every(t, cadence)?;

            q.add_point(&signal.point(t), &self.loss);
            let minimum = q.global_min();
            segment_start.push(minimum.track.label);
            argmins.push(minimum.argmin);
            global_cost = minimum.value;

            if t + 1 < n {
                let jump = ListPiece::constant(
                    &self.bound,
                    Track::new(t + 1, 0, 0, 0),
                    minimum.value + beta,
                );
                q = q.min_function(&jump);
            }
            stats.observe(q.n_pieces());
            ctx.report_progress((t + 1) as f32 / n as f32);
        }

        let mut changepoints = vec![n];
        let mut parameters = vec![argmins[n - 1]];
        let mut start = segment_start[n - 1];
        while start > 0 {
            changepoints.push(start);
            parameters.push(argmins[start - 1]);
            start = segment_start[start - 1];
        }
        changepoints.reverse();
        parameters.reverse();
        let segments = changepoints.len();

        ctx.record_scalar("engine.graph_std.pieces_total", stats.pieces_total as f64);
        ctx.record_scalar(
            "engine.graph_std.pieces_max_live",
            stats.pieces_max_live as f64,
        );

        let diagnostics = self.diagnostics(
            "graph_std",
            n,
            started_at,
            vec![format!(
                "final_objective={global_cost}, segments={segments}, beta={beta}"
            )],
            vec![],
            Some(stats),
        );
        Segmentation::new(
            n,
            changepoints,
            parameters,
            vec![0; segments],
            vec![false; segments - 1],
            global_cost,
            diagnostics,
        )
    }

    /// One-state up-graph driver with a monotonically shrinking live domain.
    pub fn fpop1d_graph_isotonic(
        &self,
        signal: &WeightedSignal,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Segmentation, GfpopError> {
        if self.graph.shape() != GraphShape::Isotonic {
            return Err(GfpopError::invalid_input(format!(
                "fpop1d_graph_isotonic requires a one-state null+up graph; got {} states and {} edges",
                self.graph.n_states(),
                self.graph.n_edges()
            )));
        }
        let up = self
            .graph
            .edges()
            .iter()
            .find(|edge| matches!(edge.kind, EdgeKind::Up))
            .expect("isotonic shape has an up edge");
        let (beta, delta) = (up.beta, up.delta);

        let n = signal.n();
        let started_at = Instant::now();
        let cadence = self.config.normalized_cancel_check_every();
        let mut stats = RuntimeStats::default();

        // Minimum of the remaining data, clamped into the domain: the live
        // left bound never needs to move past it.
        let mut remaining_min = vec![0.0; n];
        let mut current = signal.point(n - 1).y.min(self.bound.big_m);
        remaining_min[n - 1] = current;
        for t in (0..n - 1).rev() {
            if signal.point(t).y < current {
                current = signal.point(t).y;
            }
            if current > self.bound.big_m {
                current = self.bound.big_m;
            }
            remaining_min[t] = current;
        }

        let mut q_t: Vec<ListPiece> = Vec::with_capacity(n + 1);
        q_t.push(ListPiece::uniform_zero(&self.bound, Track::origin(0)));

        for t in 0..n {
            ctx.check_cancelled_every(t, cadence)?;

            let new_left = q_t[t].new_bound(remaining_min[t]);
            let mut stay = q_t[t].clone();
            stay.set_infinite_below(new_left);

            let mut jump = stay.operator_down(t, 0, 0);
            jump.add_constant(beta);
            if delta > 0.0 {
                jump.shift(delta);
            }

            let mut next = stay.min_function(&jump);
            next.add_point(&signal.point(t), &self.loss);
            stats.observe(next.n_pieces());
            q_t.push(next);
            ctx.report_progress((t + 1) as f32 / n as f32);
        }

        let final_min = q_t[n].global_min();
        if !final_min.value.is_finite() {
            let diagnostics = self.diagnostics(
                "graph_isotonic",
                n,
                started_at,
                vec![],
                vec!["no feasible isotonic fit within the search domain".to_string()],
                Some(stats),
            );
            return Ok(Segmentation::infeasible(n, diagnostics));
        }

        let global_cost = final_min.value;
        let mut changepoints = vec![n];
        let mut parameters = vec![final_min.argmin];
        let mut forced = vec![];

        let mut label = final_min.track.label;
        let mut param = final_min.argmin;
        while label > 0 {
            let cap = param - delta;
            let found = q_t[label]
                .min_in_interval(&Interval::new(f64::NEG_INFINITY, cap))
                .filter(|minimum| minimum.value.is_finite());
            let mut forced_step = false;
            let minimum = match found {
                Some(minimum) => {
                    if minimum.clipped {
                        forced_step = true;
                    }
                    minimum
                }
                None => {
                    forced_step = true;
                    let fallback = q_t[label].global_min();
                    ConstrainedMin {
                        value: fallback.value,
                        argmin: fallback.argmin,
                        track: fallback.track,
                        clipped: true,
                    }
                }
            };
            let (clamped_param, clamped) = self.bound.clamp(minimum.argmin);
            if clamped || self.clamped_to_constrained_domain(clamped_param) {
                forced_step = true;
            }

            changepoints.push(label);
            parameters.push(clamped_param);
            forced.push(forced_step);
            label = minimum.track.label;
            param = clamped_param;
        }
        changepoints.reverse();
        parameters.reverse();
        forced.reverse();
        let segments = changepoints.len();

        ctx.record_scalar(
            "engine.graph_isotonic.pieces_total",
            stats.pieces_total as f64,
        );
        ctx.record_scalar(
            "engine.graph_isotonic.pieces_max_live",
            stats.pieces_max_live as f64,
        );

        let diagnostics = self.diagnostics(
            "graph_isotonic",
            n,
            started_at,
            vec![format!(
                "final_objective={global_cost}, segments={segments}, beta={beta}, delta={delta}"
            )],
            vec![],
            Some(stats),
        );
        Segmentation::new(
            n,
            changepoints,
            parameters,
            vec![0; segments],
            forced,
            global_cost,
            diagnostics,
        )
    }

    /// General graph driver: per-edge transport, per-target-state envelope,
    /// pointwise data fold, then a track-guided backward pass.
    pub fn fpop1d_graph_complex(
        &self,
        signal: &WeightedSignal,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Segmentation, GfpopError> {
        let n = signal.n();
        let p = self.graph.n_states();
        let started_at = Instant::now();
        let cadence = self.config.normalized_cancel_check_every();
        let mut stats = RuntimeStats::default();

        // q_ts[t][s]: optimal cost of the first t points ending in state s,
        // as a function of the last segment parameter. Row 0 is a
        // placeholder; rows stay alive for the backward pass.
        let mut q_ts: Vec<Vec<ListPiece>> = Vec::with_capacity(n + 1);
        q_ts.push(vec![]);

        let mut first_row: Vec<ListPiece> = (0..p)
            .map(|s| {
                if self.graph.is_start_state(s) {
                    ListPiece::uniform_zero(&self.bound, Track::origin(s))
                } else {
                    ListPiece::infinite(&self.bound, Track::origin(s))
                }
            })
            .collect();
        for list in &mut first_row {
            list.add_point(&signal.point(0), &self.loss);
        }
        stats.observe(first_row.iter().map(ListPiece::n_pieces).sum());
        q_ts.push(first_row);

        for t in 1..n {
            ctx.check_cancelled_every(t, cadence)?;

            let q_edges: Vec<ListPiece> = self
                .graph
                .edges()
                .iter()
                .map(|edge| q_ts[t][edge.source].edge_constraint(edge, t))
                .collect();

            let mut folded: Vec<Option<ListPiece>> = (0..p).map(|_| None).collect();
            for (edge, list) in self.graph.edges().iter().zip(q_edges) {
                let slot = &mut folded[edge.target];
                *slot = Some(match slot.take() {
                    None => list,
                    Some(acc) => acc.min_function(&list),
                });
            }

            let mut row: Vec<ListPiece> = folded
                .into_iter()
                .enumerate()
                .map(|(s, slot)| {
                    slot.unwrap_or_else(|| ListPiece::infinite(&self.bound, Track::origin(s)))
                })
                .collect();
            for list in &mut row {
                list.add_point(&signal.point(t), &self.loss);
            }

            stats.observe(row.iter().map(ListPiece::n_pieces).sum());
            q_ts.push(row);
            ctx.report_progress(t as f32 / n as f32);
        }

        // Final state selection among admissible end states.
        let end_states: Vec<usize> = if self.graph.end_states().is_empty() {
            (0..p).collect()
        } else {
            self.graph.end_states().to_vec()
        };
        let mut best_state = end_states[0];
        let mut best = q_ts[n][best_state].global_min();
        for &s in &end_states[1..] {
            let candidate = q_ts[n][s].global_min();
            if candidate.value < best.value {
                best = candidate;
                best_state = s;
            }
        }

        ctx.record_scalar(
            "engine.graph_complex.pieces_total",
            stats.pieces_total as f64,
        );
        ctx.record_scalar(
            "engine.graph_complex.pieces_max_live",
            stats.pieces_max_live as f64,
        );
        ctx.report_progress(1.0);

        if !best.value.is_finite() {
            let diagnostics = self.diagnostics(
                "graph_complex",
                n,
                started_at,
                vec![],
                vec!["no admissible path through the graph reaches the end of the signal"
                    .to_string()],
                Some(stats),
            );
            return Ok(Segmentation::infeasible(n, diagnostics));
        }

        let global_cost = best.value;
        let mut changepoints = vec![n];
        let mut parameters = vec![best.argmin];
        let mut states = vec![best_state];
        let mut forced = vec![];

        let mut current_state = best_state;
        let mut current_changepoint = n;
        let mut current_param = best.argmin;
        let mut track = best.track;

        while track.label > 0 {
            let label = track.label;
            let parent = track.parent_state;

            // Undo the in-segment decay to recover the value the segment
            // started at; the jump constraint binds on that value.
            let gamma = self.graph.state_decay(current_state);
            let start_param = if gamma != 1.0 {
                let length = (current_changepoint - label) as i32;
                current_param * gamma.powi(1 - length)
            } else {
                current_param
            };

            let (constraint, missing_edge) =
                self.graph.build_interval(start_param, parent, current_state);
            let mut forced_step = missing_edge;

            let list = &q_ts[label][parent];
            let found = if missing_edge {
                None
            } else {
                list.min_in_interval(&constraint)
                    .filter(|minimum| minimum.value.is_finite())
            };
            let minimum = match found {
                Some(minimum) => {
                    if minimum.clipped {
                        forced_step = true;
                    }
                    minimum
                }
                None => {
                    forced_step = true;
                    let fallback = list.global_min();
                    ConstrainedMin {
                        value: fallback.value,
                        argmin: fallback.argmin,
                        track: fallback.track,
                        clipped: true,
                    }
                }
            };
            let (clamped_param, clamped) = self.bound.clamp(minimum.argmin);
            if clamped || self.clamped_to_constrained_domain(clamped_param) {
                forced_step = true;
            }

            changepoints.push(label);
            parameters.push(clamped_param);
            states.push(parent);
            forced.push(forced_step);

            current_state = parent;
            current_changepoint = label;
            current_param = clamped_param;
            track = minimum.track;
        }

        changepoints.reverse();
        parameters.reverse();
        states.reverse();
        forced.reverse();
        let segments = changepoints.len();

        let diagnostics = self.diagnostics(
            "graph_complex",
            n,
            started_at,
            vec![format!(
                "final_objective={global_cost}, segments={segments}, states={p}, edges={}",
                self.graph.n_edges()
            )],
            vec![],
            Some(stats),
        );
        Segmentation::new(
            n,
            changepoints,
            parameters,
            states,
            forced,
            global_cost,
            diagnostics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Omega, OmegaConfig};
    use gfpop_core::{Bound, CancelToken, ExecutionContext, Graph, WeightedSignal};
    use gfpop_costs::LossKind;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual}, |diff|={diff}, tol={tol}"
        );
    }

    fn engine(graph: Graph) -> Omega {
        Omega::new(
            graph,
            Bound::default(),
            LossKind::L2,
            OmegaConfig::default(),
        )
        .expect("engine construction should succeed")
    }

    #[test]
    fn config_default_and_construction_validation() {
        let config = OmegaConfig::default();
        assert_eq!(config.cancel_check_every, 1000);

        let graph = Graph::standard(1.0).expect("graph should be valid");
        let err = Omega::new(
            graph.clone(),
            Bound::new(1.0, -1.0, false),
            LossKind::L2,
            OmegaConfig::default(),
        )
        .expect_err("inverted bounds must fail");
        assert!(err.to_string().contains("inverted"));

        let err = Omega::new(
            graph,
            Bound::default(),
            LossKind::Huber { k: -1.0 },
            OmegaConfig::default(),
        )
        .expect_err("bad robust threshold must fail");
        assert!(err.to_string().contains("k=-1"));
    }

    #[test]
    fn driver_entry_rejects_mismatched_graph_shapes() {
        let two_state = engine(Graph::two_state_up_down(1.0, 0.0).expect("graph"));
        let signal = WeightedSignal::from_values(&[0.0, 1.0]).expect("signal");
        let ctx = ExecutionContext::new();

        let err = two_state
            .fpop1d_graph_std(&signal, &ctx)
            .expect_err("std driver needs a std graph");
        assert!(err.to_string().contains("fpop1d_graph_std"));

        let err = two_state
            .fpop1d_graph_isotonic(&signal, &ctx)
            .expect_err("isotonic driver needs an isotonic graph");
        assert!(err.to_string().contains("fpop1d_graph_isotonic"));
    }

    #[test]
    fn std_driver_single_point_is_one_segment() {
        let omega = engine(Graph::standard(1.0).expect("graph"));
        let signal = WeightedSignal::from_values(&[3.0]).expect("signal");
        let result = omega
            .fpop1d_graph_std(&signal, &ExecutionContext::new())
            .expect("driver should succeed");

        assert_eq!(result.changepoints, vec![1]);
        assert_close(result.parameters[0], 3.0, 1e-9);
        assert_close(result.global_cost, 0.0, 1e-9);
        assert_eq!(result.diagnostics.algorithm, "graph_std");
    }

    #[test]
    fn complex_driver_handles_single_point() {
        let omega = engine(Graph::two_state_up_down(0.5, 1.0).expect("graph"));
        let signal = WeightedSignal::from_values(&[2.0]).expect("signal");
        let result = omega
            .fpop1d_graph_complex(&signal, &ExecutionContext::new())
            .expect("driver should succeed");

        assert_eq!(result.changepoints, vec![1]);
        assert_close(result.parameters[0], 2.0, 1e-9);
        assert_close(result.global_cost, 0.0, 1e-9);
        assert!(result.forced.is_empty());
    }

    #[test]
    fn cancellation_between_iterations_stops_the_run() {
        let omega = Omega::new(
            Graph::standard(0.5).expect("graph"),
            Bound::default(),
            LossKind::L2,
            OmegaConfig {
                cancel_check_every: 1,
            },
        )
        .expect("engine");

        let values: Vec<f64> = (0..64).map(|i| (i % 7) as f64).collect();
        let signal = WeightedSignal::from_values(&values).expect("signal");
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = ExecutionContext::new().with_cancel(&cancel);

        let err = omega
            .fpop1d_graph_std(&signal, &ctx)
            .expect_err("cancelled token must stop the driver");
        assert_eq!(err.to_string(), "cancelled");
    }

    #[test]
    fn segment_dispatches_on_graph_shape() {
        let signal = WeightedSignal::from_values(&[0.0, 0.0, 4.0, 4.0]).expect("signal");
        let ctx = ExecutionContext::new();

        let std_result = engine(Graph::standard(1.0).expect("graph"))
            .segment(&signal, &ctx)
            .expect("std dispatch");
        assert_eq!(std_result.diagnostics.algorithm, "graph_std");

        let isotonic_result = engine(Graph::isotonic(0.0, 0.0).expect("graph"))
            .segment(&signal, &ctx)
            .expect("isotonic dispatch");
        assert_eq!(isotonic_result.diagnostics.algorithm, "graph_isotonic");

        let complex_result = engine(Graph::two_state_up_down(0.5, 3.0).expect("graph"))
            .segment(&signal, &ctx)
            .expect("complex dispatch");
        assert_eq!(complex_result.diagnostics.algorithm, "graph_complex");
    }

    #[test]
    fn infeasible_start_surfaces_as_infinite_cost() {
        // Both states restricted away from the start: every row-1 list is
        // infinite and no path reaches the end.
        let graph = Graph::two_state_up_down(0.5, 1.0)
            .expect("graph")
            .with_start_states(vec![1])
            .expect("start states")
            .with_end_states(vec![0])
            .expect("end states");
        let omega = engine(graph);
        let signal = WeightedSignal::from_values(&[1.0]).expect("signal");
        let result = omega
            .fpop1d_graph_complex(&signal, &ExecutionContext::new())
            .expect("infeasibility is not an error");

        assert!(!result.is_feasible());
        assert_eq!(result.global_cost, f64::INFINITY);
        assert!(result.changepoints.is_empty());
        assert!(
            result
                .diagnostics
                .warnings
                .iter()
                .any(|warning| warning.contains("no admissible path"))
        );
    }

    #[test]
    fn pava_driver_wraps_the_fit_into_a_segmentation() {
        let omega = engine(Graph::isotonic(0.0, 0.0).expect("graph"));
        let signal = WeightedSignal::from_values(&[4.0, 3.0, 2.0, 1.0, 0.0]).expect("signal");
        let result = omega.pava(&signal).expect("pava should succeed");

        assert_eq!(result.changepoints, vec![5]);
        assert_close(result.parameters[0], 2.0, 1e-12);
        assert_close(result.global_cost, 10.0, 1e-12);
        assert_eq!(result.diagnostics.algorithm, "pava");
        assert_eq!(result.states, vec![0]);
        assert!(result.forced.is_empty());
    }
}
