// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic synthetic inputs shared by the benchmarks.

use chrono::{Duration, TimeZone, Utc};
use wev_core::{AlignedPair, Frequency, TimeSeries, Timestamp, WevError};

pub fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

pub fn origin() -> Timestamp {
    Utc.timestamp_opt(1_577_836_800, 0)
        .single()
        .unwrap_or_default()
}

/// Wind-speed-like signal: a slow diurnal swing plus deterministic noise.
pub fn signal(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|idx| {
            let x = idx as f64;
            let noise = (lcg_next(&mut state) >> 11) as f64 / (1u64 << 53) as f64;
            8.0 + 3.0 * (x / 144.0).sin() + noise
        })
        .collect()
}

/// A regular series at `minutes` spacing with every `gap_every`-th sample
/// removed and every `dup_every`-th sample duplicated (0 disables either).
pub fn damaged_series(
    n: usize,
    minutes: u32,
    gap_every: usize,
    dup_every: usize,
) -> Result<TimeSeries, WevError> {
    let frequency = Frequency::from_minutes(minutes)?;
    let values = signal(n, 0xfeed_f00d_dead_beef);
    let mut samples = Vec::with_capacity(n + n / dup_every.max(1));
    for (idx, value) in values.into_iter().enumerate() {
        let interior = idx > 0 && idx + 1 < n;
        if interior && gap_every > 0 && idx % gap_every == 0 {
            continue;
        }
        let ts = origin() + Duration::minutes(i64::from(minutes) * idx as i64);
        samples.push((ts, value));
        if dup_every > 0 && idx % dup_every == 0 {
            samples.push((ts, value + 1.0));
        }
    }
    TimeSeries::from_samples("bench", frequency, samples)
}

/// Aligned pair of two independent signals on a regular grid.
pub fn aligned_pair(n: usize, minutes: u32) -> Result<AlignedPair, WevError> {
    let frequency = Frequency::from_minutes(minutes)?;
    let timestamps = (0..n)
        .map(|idx| origin() + Duration::minutes(i64::from(minutes) * idx as i64))
        .collect();
    AlignedPair::new(
        "base",
        "comp",
        frequency,
        timestamps,
        signal(n, 0x1234_5678),
        signal(n, 0x9abc_def0),
    )
}
