// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use std::collections::BTreeSet;
use wev_core::{EvaluationWindow, Frequency, TimeSeries, Timestamp};
use wev_qc::{align, verify, AlignConfig, AlignInput, VerifyConfig};

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn origin() -> Timestamp {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .expect("valid origin")
}

fn ten_minutes() -> Frequency {
    Frequency::from_minutes(10).expect("valid frequency")
}

fn grid_point(i: usize) -> Timestamp {
    origin() + Duration::minutes(10 * i as i64)
}

fn regular_series(values: &[f64]) -> TimeSeries {
    TimeSeries::from_samples(
        "ws",
        ten_minutes(),
        values.iter().enumerate().map(|(i, v)| (grid_point(i), *v)),
    )
    .expect("series should build")
}

fn values_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-50.0f64..50.0, 2..60)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        failure_persistence: Some(Box::new(FileFailurePersistence::Off)),
        ..ProptestConfig::default()
    })]

    #[test]
    fn verification_is_idempotent(values in values_strategy(), drop_mask in prop::collection::vec(any::<bool>(), 60)) {
        let n = values.len();
        let samples: Vec<(Timestamp, f64)> = values
            .iter()
            .enumerate()
            .filter(|(i, _)| *i == 0 || *i == n - 1 || !drop_mask[*i])
            .map(|(i, v)| (grid_point(i), *v))
            .collect();
        let input = TimeSeries::from_samples("ws", ten_minutes(), samples).expect("series should build");
        let config = VerifyConfig::new(ten_minutes());

        let once = verify(input, &config).expect("first verify should succeed");
        let twice = verify(once.series.clone(), &config).expect("second verify should succeed");

        prop_assert_eq!(twice.series.timestamps(), once.series.timestamps());
        prop_assert_eq!(twice.series.len(), once.series.len());
        for (a, b) in twice.series.values().iter().zip(once.series.values()) {
            prop_assert!(a == b || (a.is_nan() && b.is_nan()));
        }
        prop_assert_eq!(twice.diagnostics.iterations, Some(0));
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence(values in values_strategy(), picks in prop::collection::vec(0usize..60, 1..10)) {
        let n = values.len();
        let dup_indices: BTreeSet<usize> = picks.into_iter().map(|p| p % n).collect();
        let k = dup_indices.len();

        let mut samples: Vec<(Timestamp, f64)> = Vec::new();
        for (i, v) in values.iter().enumerate() {
            samples.push((grid_point(i), *v));
            if dup_indices.contains(&i) {
                samples.push((grid_point(i), *v + 1000.0));
            }
        }
        let input = TimeSeries::from_samples("ws", ten_minutes(), samples).expect("series should build");

        let verified = verify(input, &VerifyConfig::new(ten_minutes())).expect("verify should succeed");

        prop_assert_eq!(verified.series.values(), values.as_slice());
        prop_assert_eq!(verified.diagnostics.duplicates_removed.len(), k);
        let fixups = verified.diagnostics.iterations.expect("iterations recorded");
        prop_assert!(fixups >= 1 && fixups <= k);
    }

    #[test]
    fn missing_interior_samples_become_nan_rows(values in values_strategy(), drop_mask in prop::collection::vec(any::<bool>(), 60)) {
        let n = values.len();
        let dropped: Vec<usize> = (1..n - 1).filter(|i| drop_mask[*i]).collect();
        let samples: Vec<(Timestamp, f64)> = values
            .iter()
            .enumerate()
            .filter(|(i, _)| !dropped.contains(i))
            .map(|(i, v)| (grid_point(i), *v))
            .collect();
        let input = TimeSeries::from_samples("ws", ten_minutes(), samples).expect("series should build");

        let verified = verify(input, &VerifyConfig::new(ten_minutes())).expect("verify should succeed");

        prop_assert_eq!(verified.series.len(), n);
        prop_assert_eq!(verified.series.nan_count(), dropped.len());
        prop_assert_eq!(verified.diagnostics.gaps_filled.len(), dropped.len());
        let span = verified.series.span().expect("non-empty");
        prop_assert_eq!(verified.series.len() as i64, span.num_minutes() / 10 + 1);
        for i in dropped {
            prop_assert!(verified.series.values()[i].is_nan());
        }
    }

    #[test]
    fn self_alignment_yields_identical_columns(values in values_strategy()) {
        let series = regular_series(&values);
        let end = grid_point(values.len() - 1);
        let config = AlignConfig::new(EvaluationWindow::new(origin(), end).expect("valid window"));

        let outcome = align(
            AlignInput::new(&series, ten_minutes()),
            AlignInput::new(&series, ten_minutes()),
            &config,
        )
        .expect("self alignment should succeed");

        prop_assert_eq!(outcome.pair.len(), values.len());
        prop_assert_eq!(outcome.pair.baseline(), outcome.pair.comparison());
        prop_assert!(outcome.diagnostics.warnings.is_empty());
    }
}
