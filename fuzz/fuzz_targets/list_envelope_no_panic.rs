// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use arbitrary::Arbitrary;
use gfpop_core::{Bound, WeightedPoint};
use gfpop_costs::LossKind;
use gfpop_engine::{ListPiece, Track};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct EnvelopeInput {
    left: Vec<(f64, f64)>,
    right: Vec<(f64, f64)>,
    huber_k: f64,
}

fn build(points: &[(f64, f64)], kind: &LossKind, track: Track) -> Option<ListPiece> {
    if points.is_empty() || points.len() > 32 {
        return None;
    }
    let bound = Bound::new(-1.0e3, 1.0e3, false);
    let mut list = ListPiece::uniform_zero(&bound, track);
    for &(y, w) in points {
        if !y.is_finite() || !w.is_finite() {
            return None;
        }
        let pt = WeightedPoint::new(y.clamp(-500.0, 500.0), w.abs().clamp(0.01, 10.0));
        list.add_point(&pt, kind);
    }
    Some(list)
}

fuzz_target!(|input: EnvelopeInput| {
    let kind = if input.huber_k.is_finite() && input.huber_k > 0.01 {
        LossKind::Huber {
            k: input.huber_k.min(100.0),
        }
    } else {
        LossKind::L2
    };

    let Some(left) = build(&input.left, &kind, Track::new(0, 0, 0, 0)) else {
        return;
    };
    let Some(right) = build(&input.right, &kind, Track::new(1, 1, 0, 0)) else {
        return;
    };

    let domain = Bound::new(-1.0e3, 1.0e3, false).as_interval();
    let envelope = left.min_function(&right);
    envelope
        .check_invariants(&domain)
        .expect("envelope must preserve list invariants");

    let running = envelope.running_min_left();
    running
        .check_invariants(&domain)
        .expect("running min must preserve list invariants");
});
