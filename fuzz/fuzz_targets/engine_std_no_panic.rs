// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use arbitrary::Arbitrary;
use gfpop_core::{Bound, ExecutionContext, Graph, WeightedSignal};
use gfpop_costs::LossKind;
use gfpop_engine::{Omega, OmegaConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct StdInput {
    values: Vec<f64>,
    beta: f64,
}

fuzz_target!(|input: StdInput| {
    if input.values.is_empty() || input.values.len() > 64 {
        return;
    }
    let values: Vec<f64> = input
        .values
        .iter()
        .map(|v| if v.is_finite() { v.clamp(-1.0e4, 1.0e4) } else { 0.0 })
        .collect();
    let beta = if input.beta.is_finite() {
        input.beta.abs().min(1.0e6)
    } else {
        1.0
    };

    let signal = match WeightedSignal::from_values(&values) {
        Ok(signal) => signal,
        Err(_) => return,
    };
    let graph = Graph::standard(beta).expect("std graph is always valid");
    let omega = Omega::new(
        graph,
        Bound::new(-1.0e5, 1.0e5, false),
        LossKind::L2,
        OmegaConfig::default(),
    )
    .expect("engine construction is valid");

    let result = omega
        .fpop1d_graph_std(&signal, &ExecutionContext::new())
        .expect("std driver must not fail on valid input");
    assert_eq!(result.changepoints.last().copied(), Some(signal.n()));
    assert!(result.global_cost.is_finite());
});
