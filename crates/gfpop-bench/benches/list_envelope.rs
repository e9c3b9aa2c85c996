// SPDX-License-Identifier: MIT OR Apache-2.0

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gfpop_core::{Bound, WeightedPoint};
use gfpop_costs::LossKind;
use gfpop_engine::{ListPiece, Track};

fn loaded_list(offset: f64, points: usize) -> ListPiece {
    let bound = Bound::new(-1.0e3, 1.0e3, false);
    let mut list = ListPiece::uniform_zero(&bound, Track::new(0, 0, 0, 0));
    for idx in 0..points {
        let y = offset + ((idx as f64) * 1.3).sin() * 4.0;
        list.add_point(&WeightedPoint::new(y, 1.0), &LossKind::L2);
    }
    list
}

fn bench_min_function(c: &mut Criterion) {
    let left = loaded_list(0.0, 32);
    let right = loaded_list(3.0, 32);
    c.bench_function("min_function_32pts", |b| {
        b.iter(|| black_box(left.min_function(black_box(&right))).n_pieces())
    });
}

fn bench_running_min(c: &mut Criterion) {
    let list = loaded_list(1.0, 32);
    c.bench_function("running_min_left_32pts", |b| {
        b.iter(|| black_box(list.running_min_left()).n_pieces())
    });
}

fn bench_robust_add_point(c: &mut Criterion) {
    c.bench_function("add_point_huber_64", |b| {
        b.iter(|| {
            let mut list = loaded_list(0.0, 1);
            for idx in 0..64 {
                let y = ((idx as f64) * 0.9).cos() * 6.0;
                list.add_point(&WeightedPoint::new(y, 1.0), &LossKind::Huber { k: 1.5 });
            }
            black_box(list.n_pieces())
        })
    });
}

criterion_group!(
    benches,
    bench_min_function,
    bench_running_min,
    bench_robust_add_point
);
criterion_main!(benches);
