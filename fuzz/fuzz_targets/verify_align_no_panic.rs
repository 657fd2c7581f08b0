// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use chrono::{Duration, TimeZone, Utc};
use common::ByteCursor;
use libfuzzer_sys::fuzz_target;
use wev_core::{EvaluationWindow, Frequency, TimeSeries};
use wev_eval::ContingencyTable;
use wev_qc::{align, verify, AlignConfig, AlignInput, SelectionPolicy, VerifyConfig};
use wev_ramps::RampDefinition;

const MAX_SAMPLES: usize = 512;

fuzz_target!(|data: &[u8]| {
    let mut cursor = ByteCursor::new(data);
    let minutes = u32::from(cursor.u8() % 60) + 1;
    let max_iterations = usize::from(cursor.u8() % 10) + 1;
    let average = cursor.u8() % 2 == 0;

    let Some(origin) = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single() else {
        return;
    };
    let Ok(frequency) = Frequency::from_minutes(minutes) else {
        return;
    };

    // Offsets in minutes from the origin, so duplicates, gaps and off-grid
    // samples all occur.
    let mut samples = Vec::new();
    while cursor.remaining() >= 3 && samples.len() < MAX_SAMPLES {
        let offset = i64::from(cursor.u16() % 4096);
        let raw = cursor.i8();
        let value = if raw == i8::MIN { f64::NAN } else { f64::from(raw) };
        samples.push((origin + Duration::minutes(offset), value));
    }

    let Ok(series) = TimeSeries::from_samples("fuzz", frequency, samples) else {
        return;
    };
    let config = VerifyConfig::new(frequency).with_max_iterations(max_iterations);
    let Ok(verified) = verify(series, &config) else {
        return;
    };
    assert!(!verified.series.has_duplicate_timestamps());

    let (Some(start), Some(end)) = (
        verified.series.first_timestamp(),
        verified.series.last_timestamp(),
    ) else {
        return;
    };
    let Ok(window) = EvaluationWindow::new(start, end) else {
        return;
    };
    let policy = if average {
        SelectionPolicy::Average
    } else {
        SelectionPolicy::Instance
    };
    let Ok(outcome) = align(
        AlignInput::new(&verified.series, frequency),
        AlignInput::new(&verified.series, frequency),
        &AlignConfig::new(window).with_policy(policy),
    ) else {
        return;
    };

    let definition = RampDefinition::AbsoluteMagnitude {
        magnitude: 4.0,
        duration_minutes: minutes * 2,
    };
    let Ok(classifier) = definition.build("u") else {
        return;
    };
    let flags = classifier.classify(&outcome.pair);
    if let Ok(table) = ContingencyTable::from_flags(&flags.baseline, &flags.comparison) {
        assert_eq!(table.false_positive + table.false_negative, 0);
        let _ = table.scores();
    }
});
