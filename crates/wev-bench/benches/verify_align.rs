// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wev_bench::{damaged_series, origin};
use wev_core::{EvaluationWindow, Frequency};
use wev_qc::{align, verify, AlignConfig, AlignInput, SelectionPolicy, VerifyConfig};

// One year of 10-minute samples.
const N: usize = 52_560;

fn benchmark_verify(c: &mut Criterion) {
    let frequency = Frequency::from_minutes(10).expect("valid frequency");
    let config = VerifyConfig::new(frequency);
    let clean = damaged_series(N, 10, 0, 0).expect("series should build");
    let damaged = damaged_series(N, 10, 97, 131).expect("series should build");

    let mut group = c.benchmark_group("verify");
    group.bench_function("clean_n52560", |b| {
        b.iter(|| {
            verify(black_box(clean.clone()), black_box(&config)).expect("verify should succeed")
        })
    });
    group.bench_function("gaps_and_duplicates_n52560", |b| {
        b.iter(|| {
            verify(black_box(damaged.clone()), black_box(&config)).expect("verify should succeed")
        })
    });
    group.finish();
}

fn benchmark_align(c: &mut Criterion) {
    let ten = Frequency::from_minutes(10).expect("valid frequency");
    let hourly = Frequency::from_minutes(60).expect("valid frequency");
    let fine = damaged_series(N, 10, 0, 0).expect("series should build");
    let coarse = damaged_series(N / 6, 60, 0, 0).expect("series should build");
    let end = fine.last_timestamp().expect("non-empty series");
    let window = EvaluationWindow::new(origin(), end).expect("valid window");

    let mut group = c.benchmark_group("align");
    for policy in [SelectionPolicy::Average, SelectionPolicy::Instance] {
        let config = AlignConfig::new(window).with_policy(policy);
        group.bench_function(format!("10min_to_hourly_{}", policy.as_str()), |b| {
            b.iter(|| {
                align(
                    AlignInput::new(black_box(&fine), ten),
                    AlignInput::new(black_box(&coarse), hourly),
                    &config,
                )
                .expect("align should succeed")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_verify, benchmark_align);
criterion_main!(benches);
