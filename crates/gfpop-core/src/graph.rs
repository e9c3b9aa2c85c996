// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GfpopError;
use crate::interval::Interval;

/// Shape constraint carried by a transition.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// Same-segment continuation (no changepoint).
    Null,
    /// Up jump of at least `delta`.
    Up,
    /// Down jump of at least `delta`.
    Down,
    /// Unconstrained jump.
    Std,
    /// Jump of magnitude at least `delta`, either direction.
    Abs,
}

impl EdgeKind {
    pub fn name(&self) -> &'static str {
        match self {
            EdgeKind::Null => "null",
            EdgeKind::Up => "up",
            EdgeKind::Down => "down",
            EdgeKind::Std => "std",
            EdgeKind::Abs => "abs",
        }
    }

    pub fn is_jump(&self) -> bool {
        !matches!(self, EdgeKind::Null)
    }
}

/// Directed transition between segment states.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub kind: EdgeKind,
    pub beta: f64,
    pub delta: f64,
    pub decay: f64,
}

impl Edge {
    pub fn new(source: usize, target: usize, kind: EdgeKind, beta: f64) -> Self {
        Self {
            source,
            target,
            kind,
            beta,
            delta: 0.0,
            decay: 1.0,
        }
    }

    /// Null self-edge on `state`.
    pub fn null(state: usize, beta: f64) -> Self {
        Self::new(state, state, EdgeKind::Null, beta)
    }

    pub fn up(source: usize, target: usize, beta: f64, delta: f64) -> Self {
        Self::new(source, target, EdgeKind::Up, beta).with_delta(delta)
    }

    pub fn down(source: usize, target: usize, beta: f64, delta: f64) -> Self {
        Self::new(source, target, EdgeKind::Down, beta).with_delta(delta)
    }

    pub fn std_jump(source: usize, target: usize, beta: f64) -> Self {
        Self::new(source, target, EdgeKind::Std, beta)
    }

    pub fn abs_jump(source: usize, target: usize, beta: f64, delta: f64) -> Self {
        Self::new(source, target, EdgeKind::Abs, beta).with_delta(delta)
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    fn validate(&self, index: usize, n_states: usize) -> Result<(), GfpopError> {
        if self.source >= n_states || self.target >= n_states {
            return Err(GfpopError::invalid_input(format!(
                "edge {index} references state out of range: source={}, target={}, n_states={n_states}",
                self.source, self.target
            )));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(GfpopError::invalid_input(format!(
                "edge {index} penalty must be finite and >= 0; got beta={}",
                self.beta
            )));
        }
        if !self.delta.is_finite() {
            return Err(GfpopError::invalid_input(format!(
                "edge {index} jump parameter must be finite; got delta={}",
                self.delta
            )));
        }
        if self.kind.is_jump() && self.delta < 0.0 {
            return Err(GfpopError::invalid_input(format!(
                "edge {index} jump magnitude must be >= 0; got delta={} on kind={}",
                self.delta,
                self.kind.name()
            )));
        }
        if !self.decay.is_finite() || self.decay <= 0.0 {
            return Err(GfpopError::invalid_input(format!(
                "edge {index} decay must be finite and > 0; got decay={}",
                self.decay
            )));
        }
        if self.decay != 1.0 && self.kind.is_jump() {
            return Err(GfpopError::not_supported(format!(
                "edge {index}: decay applies to null continuation edges only; got decay={} on kind={}",
                self.decay,
                self.kind.name()
            )));
        }
        if matches!(self.kind, EdgeKind::Null) && self.source != self.target {
            return Err(GfpopError::invalid_input(format!(
                "edge {index}: null edges must be self-edges; got source={}, target={}",
                self.source, self.target
            )));
        }
        Ok(())
    }
}

/// Driver selection derived from the graph structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphShape {
    /// One state, null + unconstrained-jump self-edges.
    Std,
    /// One state, null + up self-edges.
    Isotonic,
    /// Anything else.
    Complex,
}

/// States, admissible transitions, and optional start/end state sets.
///
/// Edges must arrive grouped by target state in ascending target order; the
/// per-target envelope step consumes them contiguously and the constructor
/// rejects any other ordering.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    n_states: usize,
    edges: Vec<Edge>,
    start_states: Vec<usize>,
    end_states: Vec<usize>,
}

impl Graph {
    pub fn new(n_states: usize, edges: Vec<Edge>) -> Result<Self, GfpopError> {
        if n_states == 0 {
            return Err(GfpopError::invalid_input(
                "graph must have at least one state; got n_states=0",
            ));
        }
        if edges.is_empty() {
            return Err(GfpopError::invalid_input(
                "graph must have at least one edge; got no edges",
            ));
        }

        for (index, edge) in edges.iter().enumerate() {
            edge.validate(index, n_states)?;
        }

        for window in edges.windows(2) {
            if window[1].target < window[0].target {
                return Err(GfpopError::invalid_input(format!(
                    "edges must be grouped by target state in ascending order; got target={} after target={}",
                    window[1].target, window[0].target
                )));
            }
        }

        for (index, edge) in edges.iter().enumerate() {
            let duplicate = edges[..index]
                .iter()
                .any(|prev| {
                    prev.source == edge.source
                        && prev.target == edge.target
                        && prev.kind == edge.kind
                });
            if duplicate {
                return Err(GfpopError::invalid_input(format!(
                    "duplicate edge {index}: ({} -> {}, kind={})",
                    edge.source,
                    edge.target,
                    edge.kind.name()
                )));
            }
        }

        Ok(Self {
            n_states,
            edges,
            start_states: vec![],
            end_states: vec![],
        })
    }

    /// Restricts the admissible first-segment states (empty means "any").
    pub fn with_start_states(mut self, states: Vec<usize>) -> Result<Self, GfpopError> {
        Self::validate_state_set(&states, self.n_states, "start")?;
        self.start_states = states;
        Ok(self)
    }

    /// Restricts the admissible last-segment states (empty means "any").
    pub fn with_end_states(mut self, states: Vec<usize>) -> Result<Self, GfpopError> {
        Self::validate_state_set(&states, self.n_states, "end")?;
        self.end_states = states;
        Ok(self)
    }

    fn validate_state_set(
        states: &[usize],
        n_states: usize,
        which: &str,
    ) -> Result<(), GfpopError> {
        for &s in states {
            if s >= n_states {
                return Err(GfpopError::invalid_input(format!(
                    "{which} state {s} out of range; n_states={n_states}"
                )));
            }
        }
        Ok(())
    }

    /// One-state graph for unconstrained segmentation with penalty `beta`.
    pub fn standard(beta: f64) -> Result<Self, GfpopError> {
        Self::new(1, vec![Edge::null(0, 0.0), Edge::std_jump(0, 0, beta)])
    }

    /// One-state graph for isotonic (non-decreasing) segmentation.
    pub fn isotonic(beta: f64, delta: f64) -> Result<Self, GfpopError> {
        Self::new(1, vec![Edge::null(0, 0.0), Edge::up(0, 0, beta, delta)])
    }

    /// Two-state graph alternating up and down jumps of at least `delta`.
    pub fn two_state_up_down(beta: f64, delta: f64) -> Result<Self, GfpopError> {
        Self::new(
            2,
            vec![
                Edge::null(0, 0.0),
                Edge::down(1, 0, beta, delta),
                Edge::null(1, 0.0),
                Edge::up(0, 1, beta, delta),
            ],
        )
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, index: usize) -> &Edge {
        &self.edges[index]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn start_states(&self) -> &[usize] {
        &self.start_states
    }

    pub fn end_states(&self) -> &[usize] {
        &self.end_states
    }

    /// Returns true when `state` may start the segmentation.
    pub fn is_start_state(&self, state: usize) -> bool {
        self.start_states.is_empty() || self.start_states.contains(&state)
    }

    /// Decay factor of the null continuation on `state`; 1.0 when none.
    pub fn state_decay(&self, state: usize) -> f64 {
        self.edges
            .iter()
            .find(|edge| {
                matches!(edge.kind, EdgeKind::Null) && edge.source == state && edge.target == state
            })
            .map(|edge| edge.decay)
            .unwrap_or(1.0)
    }

    /// Classifies the graph for driver dispatch.
    ///
    /// Decay graphs always take the general driver: the specialized drivers
    /// have no decay step.
    pub fn shape(&self) -> GraphShape {
        if self.n_states == 1
            && self.edges.len() == 2
            && self.edges.iter().all(|edge| edge.decay == 1.0)
        {
            let kinds = (self.edges[0].kind, self.edges[1].kind);
            match kinds {
                (EdgeKind::Null, EdgeKind::Std) | (EdgeKind::Std, EdgeKind::Null) => {
                    return GraphShape::Std;
                }
                (EdgeKind::Null, EdgeKind::Up) | (EdgeKind::Up, EdgeKind::Null) => {
                    return GraphShape::Isotonic;
                }
                _ => {}
            }
        }
        GraphShape::Complex
    }

    /// Admissible interval for the predecessor segment's end parameter, given
    /// a recovered start parameter `start_param` of the segment entered via a
    /// jump from `parent` to `current`.
    ///
    /// The second return value is true when no jump edge admits the
    /// transition, in which case the backward pass must fall back to an
    /// unconstrained search and report the step as forced.
    pub fn build_interval(
        &self,
        start_param: f64,
        parent: usize,
        current: usize,
    ) -> (Interval, bool) {
        let mut hull = Interval::empty();
        let mut unconstrained = false;

        for edge in &self.edges {
            if edge.source != parent || edge.target != current || !edge.kind.is_jump() {
                continue;
            }
            match edge.kind {
                EdgeKind::Std => unconstrained = true,
                EdgeKind::Up => {
                    hull = hull_union(hull, Interval::new(f64::NEG_INFINITY, start_param - edge.delta));
                }
                EdgeKind::Down => {
                    hull = hull_union(hull, Interval::new(start_param + edge.delta, f64::INFINITY));
                }
                EdgeKind::Abs => {
                    hull = hull_union(hull, Interval::new(f64::NEG_INFINITY, start_param - edge.delta));
                    hull = hull_union(hull, Interval::new(start_param + edge.delta, f64::INFINITY));
                }
                EdgeKind::Null => {}
            }
        }

        if unconstrained {
            return (Interval::new(f64::NEG_INFINITY, f64::INFINITY), false);
        }
        let forced = hull.is_empty();
        (hull, forced)
    }
}

/// Enclosing hull of two intervals (empty operands are ignored).
fn hull_union(left: Interval, right: Interval) -> Interval {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }
    Interval::new(left.a().min(right.a()), left.b().max(right.b()))
}

#[cfg(test)]
mod tests {
    use super::{Edge, EdgeKind, Graph, GraphShape};

    #[test]
    fn edge_kind_names_are_stable() {
        assert_eq!(EdgeKind::Null.name(), "null");
        assert_eq!(EdgeKind::Up.name(), "up");
        assert_eq!(EdgeKind::Down.name(), "down");
        assert_eq!(EdgeKind::Std.name(), "std");
        assert_eq!(EdgeKind::Abs.name(), "abs");
    }

    #[test]
    fn canonical_constructors_validate_and_classify() {
        let std_graph = Graph::standard(2.0).expect("standard graph should be valid");
        assert_eq!(std_graph.shape(), GraphShape::Std);
        assert_eq!(std_graph.n_states(), 1);
        assert_eq!(std_graph.n_edges(), 2);

        let isotonic = Graph::isotonic(0.0, 0.5).expect("isotonic graph should be valid");
        assert_eq!(isotonic.shape(), GraphShape::Isotonic);

        let two_state = Graph::two_state_up_down(0.5, 3.0).expect("two-state graph should be valid");
        assert_eq!(two_state.shape(), GraphShape::Complex);
        assert_eq!(two_state.n_states(), 2);
    }

    #[test]
    fn rejects_empty_graphs_and_out_of_range_states() {
        let err = Graph::new(0, vec![Edge::null(0, 0.0)]).expect_err("no states must fail");
        assert!(err.to_string().contains("at least one state"));

        let err = Graph::new(1, vec![]).expect_err("no edges must fail");
        assert!(err.to_string().contains("at least one edge"));

        let err = Graph::new(1, vec![Edge::up(0, 1, 1.0, 0.0)])
            .expect_err("out-of-range target must fail");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn rejects_invalid_edge_parameters() {
        let err = Graph::new(1, vec![Edge::null(0, -1.0)]).expect_err("negative beta must fail");
        assert!(err.to_string().contains("beta=-1"));

        let err = Graph::new(1, vec![Edge::up(0, 0, 0.0, -2.0)])
            .expect_err("negative jump magnitude must fail");
        assert!(err.to_string().contains("delta=-2"));

        let err = Graph::new(1, vec![Edge::null(0, 0.0).with_decay(0.0)])
            .expect_err("zero decay must fail");
        assert!(err.to_string().contains("decay=0"));

        let err = Graph::new(1, vec![Edge::up(0, 0, 0.0, 1.0).with_decay(0.5)])
            .expect_err("decay on jump edge must fail");
        assert!(err.to_string().contains("null continuation edges only"));

        let err = Graph::new(2, vec![Edge::new(0, 1, EdgeKind::Null, 0.0)])
            .expect_err("null edge across states must fail");
        assert!(err.to_string().contains("self-edges"));
    }

    #[test]
    fn rejects_edges_not_grouped_by_target() {
        let err = Graph::new(
            2,
            vec![
                Edge::null(1, 0.0),
                Edge::null(0, 0.0),
            ],
        )
        .expect_err("descending targets must fail");
        assert!(err.to_string().contains("grouped by target state"));
    }

    #[test]
    fn rejects_duplicate_edges() {
        let err = Graph::new(
            1,
            vec![Edge::std_jump(0, 0, 1.0), Edge::std_jump(0, 0, 2.0)],
        )
        .expect_err("duplicate (source, target, kind) must fail");
        assert!(err.to_string().contains("duplicate edge"));
    }

    #[test]
    fn start_and_end_state_sets_are_validated() {
        let graph = Graph::two_state_up_down(1.0, 0.0).expect("graph should be valid");
        let graph = graph
            .with_start_states(vec![0])
            .expect("start set should be valid")
            .with_end_states(vec![1])
            .expect("end set should be valid");
        assert!(graph.is_start_state(0));
        assert!(!graph.is_start_state(1));
        assert_eq!(graph.end_states(), &[1]);

        let err = Graph::standard(1.0)
            .expect("graph should be valid")
            .with_start_states(vec![3])
            .expect_err("out-of-range start state must fail");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn empty_start_set_admits_every_state() {
        let graph = Graph::two_state_up_down(1.0, 0.0).expect("graph should be valid");
        assert!(graph.is_start_state(0));
        assert!(graph.is_start_state(1));
    }

    #[test]
    fn state_decay_reads_null_edge_and_defaults_to_one() {
        let graph = Graph::new(
            1,
            vec![
                Edge::null(0, 0.0).with_decay(0.9),
                Edge::std_jump(0, 0, 1.0),
            ],
        )
        .expect("decay graph should be valid");
        assert_eq!(graph.state_decay(0), 0.9);

        let plain = Graph::standard(1.0).expect("graph should be valid");
        assert_eq!(plain.state_decay(0), 1.0);
    }

    #[test]
    fn build_interval_up_down_and_std() {
        let graph = Graph::two_state_up_down(0.5, 3.0).expect("graph should be valid");

        // Segment in state 1 entered from state 0 by an up jump of >= 3:
        // the predecessor must sit at or below start_param - 3.
        let (up, forced) = graph.build_interval(5.0, 0, 1);
        assert!(!forced);
        assert_eq!(up.b(), 2.0);
        assert!(up.contains(-100.0));

        let (down, forced) = graph.build_interval(0.0, 1, 0);
        assert!(!forced);
        assert_eq!(down.a(), 3.0);
        assert!(down.contains(100.0));

        let std_graph = Graph::standard(1.0).expect("graph should be valid");
        let (all, forced) = std_graph.build_interval(1.0, 0, 0);
        assert!(!forced);
        assert!(all.contains(-1.0e9) && all.contains(1.0e9));
    }

    #[test]
    fn build_interval_abs_hull_and_missing_edge() {
        let graph = Graph::new(
            1,
            vec![Edge::null(0, 0.0), Edge::abs_jump(0, 0, 1.0, 2.0)],
        )
        .expect("abs graph should be valid");

        let (hull, forced) = graph.build_interval(0.0, 0, 0);
        assert!(!forced);
        assert!(hull.contains(-5.0) && hull.contains(5.0));

        let two_state = Graph::two_state_up_down(1.0, 1.0).expect("graph should be valid");
        // No jump edge goes 0 -> 0 in the two-state graph.
        let (missing, forced) = two_state.build_interval(0.0, 0, 0);
        assert!(forced);
        assert!(missing.is_empty());
    }
}
