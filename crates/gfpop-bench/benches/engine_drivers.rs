// SPDX-License-Identifier: MIT OR Apache-2.0

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gfpop_core::{Bound, ExecutionContext, Graph, WeightedSignal};
use gfpop_costs::LossKind;
use gfpop_engine::{Omega, OmegaConfig};

fn synthetic_signal(n: usize) -> WeightedSignal {
    let values: Vec<f64> = (0..n)
        .map(|t| {
            let level = if (t / 50) % 2 == 0 { 0.0 } else { 5.0 };
            level + ((t as f64) * 0.7).sin() * 0.3
        })
        .collect();
    WeightedSignal::from_values(&values).expect("bench signal should be valid")
}

fn engine(graph: Graph) -> Omega {
    Omega::new(
        graph,
        Bound::new(-1.0e5, 1.0e5, false),
        LossKind::L2,
        OmegaConfig::default(),
    )
    .expect("bench engine should be valid")
}

fn bench_std_driver(c: &mut Criterion) {
    let signal = synthetic_signal(500);
    let omega = engine(Graph::standard(2.0).expect("graph"));
    c.bench_function("graph_std_n500", |b| {
        b.iter(|| {
            let result = omega
                .fpop1d_graph_std(black_box(&signal), &ExecutionContext::new())
                .expect("driver should succeed");
            black_box(result.global_cost)
        })
    });
}

fn bench_isotonic_driver(c: &mut Criterion) {
    let signal = synthetic_signal(300);
    let omega = engine(Graph::isotonic(1.0, 0.0).expect("graph"));
    c.bench_function("graph_isotonic_n300", |b| {
        b.iter(|| {
            let result = omega
                .fpop1d_graph_isotonic(black_box(&signal), &ExecutionContext::new())
                .expect("driver should succeed");
            black_box(result.global_cost)
        })
    });
}

fn bench_complex_driver(c: &mut Criterion) {
    let signal = synthetic_signal(200);
    let omega = engine(Graph::two_state_up_down(2.0, 3.0).expect("graph"));
    c.bench_function("graph_complex_two_state_n200", |b| {
        b.iter(|| {
            let result = omega
                .fpop1d_graph_complex(black_box(&signal), &ExecutionContext::new())
                .expect("driver should succeed");
            black_box(result.global_cost)
        })
    });
}

criterion_group!(
    benches,
    bench_std_driver,
    bench_isotonic_driver,
    bench_complex_driver
);
criterion_main!(benches);
