// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::Duration;
use tracing::{debug, info, warn};
use wev_core::{format_timestamp, Diagnostics, Frequency, TimeSeries, Timestamp, WevError};

/// Upper bound on repair passes. A well-formed series settles in at most
/// three (dedup, regrid, confirm); the cap only guards pathological input.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Largest regular grid gap-filling may build, as a multiple of the input
/// length. A stray timestamp years away from the rest would otherwise
/// allocate an enormous grid of `NaN`s.
pub const DEFAULT_MAX_GRID_FACTOR: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct VerifyConfig {
    /// Nominal sampling frequency of the series.
    pub frequency: Frequency,
    /// Externally reported sample count (e.g. from a parser); seeds the first
    /// pass only. Later passes always use the series length.
    pub reported_len: Option<usize>,
    pub max_iterations: usize,
    pub max_grid_factor: usize,
    /// Sentinel the source writes for invalid samples (e.g. `-999`); equal
    /// values are replaced with `NaN` before any repair.
    pub flag: Option<f64>,
}

impl VerifyConfig {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            reported_len: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_grid_factor: DEFAULT_MAX_GRID_FACTOR,
            flag: None,
        }
    }

    pub fn with_reported_len(mut self, reported_len: usize) -> Self {
        self.reported_len = Some(reported_len);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_grid_factor(mut self, max_grid_factor: usize) -> Self {
        self.max_grid_factor = max_grid_factor;
        self
    }

    pub fn with_flag(mut self, flag: f64) -> Self {
        self.flag = Some(flag);
        self
    }

    fn max_grid_len(&self, input_len: usize) -> usize {
        input_len.max(1).saturating_mul(self.max_grid_factor.max(1))
    }
}

/// A series satisfying the verified invariants plus the record of repairs.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedSeries {
    pub series: TimeSeries,
    pub diagnostics: Diagnostics,
}

/// Repairs duplicated or missing samples until the sample count matches the
/// count implied by the series span and `config.frequency`.
///
/// On success the series has unique timestamps on the regular grid anchored at
/// its first sample, `len == span / freq + 1`, and gaps are explicit `NaN`s.
pub fn verify(series: TimeSeries, config: &VerifyConfig) -> Result<VerifiedSeries, WevError> {
    if config.max_iterations == 0 {
        return Err(WevError::invalid_input("max_iterations must be >= 1"));
    }
    if series.is_empty() {
        return Err(WevError::missing_data(format!(
            "series '{}' has no samples to verify",
            series.label()
        )));
    }

    let freq = config.frequency;
    let mut diagnostics = Diagnostics::for_stage("verify", series.label());
    check_leading_step(&series, freq, &mut diagnostics);
    let series = match config.flag {
        Some(flag) => mask_flagged(series, flag, &mut diagnostics)?,
        None => series,
    };

    let mut actual = match config.reported_len {
        Some(reported) => {
            if reported != series.len() {
                let message = format!(
                    "{}: reported sample count {reported} differs from series length {}",
                    series.label(),
                    series.len()
                );
                warn!(series = series.label(), "{message}");
                diagnostics.warn(message);
            }
            reported
        }
        None => series.len(),
    };
    let input_len = series.len();
    let mut current = series;
    let mut fixups = 0usize;

    for _ in 0..config.max_iterations {
        let (first, last) = match (current.first_timestamp(), current.last_timestamp()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(WevError::missing_data(format!(
                    "series '{}' lost all samples during verification",
                    current.label()
                )))
            }
        };
        let desired = freq.implied_len(last - first);
        diagnostics.desired_len = Some(desired);

        let count_matches = actual as f64 == desired;
        if count_matches && actual != current.len() {
            // The reported count agreed with the window but the data does not.
            actual = current.len();
            continue;
        }

        let has_duplicates = current.has_duplicate_timestamps();
        let on_grid = is_on_grid(&current, freq);
        if count_matches && !has_duplicates && on_grid {
            info!(
                series = current.label(),
                from = %format_timestamp(first),
                to = %format_timestamp(last),
                every = %freq,
                len = current.len(),
                "series has unique and continuous samples"
            );
            diagnostics.note(format!(
                "{} samples from {} to {} every {freq}",
                current.len(),
                format_timestamp(first),
                format_timestamp(last)
            ));
            diagnostics.iterations = Some(fixups);
            diagnostics.final_len = Some(current.len());
            return Ok(VerifiedSeries {
                series: current,
                diagnostics,
            });
        }

        let message = format!(
            "{}: sample count {actual} does not match desired length {desired} \
             implied by {} to {} every {freq}",
            current.label(),
            format_timestamp(first),
            format_timestamp(last)
        );
        warn!(series = current.label(), "{message}");
        diagnostics.warn(message);

        fixups += 1;
        current = if has_duplicates {
            remove_duplicates(current, &mut diagnostics)?
        } else {
            fill_to_grid(current, freq, config.max_grid_len(input_len), &mut diagnostics)?
        };
        actual = current.len();
    }

    Err(WevError::non_convergent(format!(
        "series '{}' still inconsistent after {} repair passes (len={actual}, desired={})",
        current.label(),
        config.max_iterations,
        diagnostics.desired_len.unwrap_or(f64::NAN)
    )))
}

/// Replaces every value equal to `flag` with `NaN`, logging each timestamp.
pub fn mask_flagged(
    series: TimeSeries,
    flag: f64,
    diagnostics: &mut Diagnostics,
) -> Result<TimeSeries, WevError> {
    if !flag.is_finite() {
        return Err(WevError::invalid_input(format!(
            "flag value must be finite, got {flag}"
        )));
    }
    let (label, interval, timestamps, mut values) = series.into_parts();
    let mut masked = Vec::new();
    for (ts, value) in timestamps.iter().zip(values.iter_mut()) {
        if *value == flag {
            warn!(
                series = label.as_str(),
                at = %format_timestamp(*ts),
                flag,
                "flagged value set to NaN"
            );
            *value = f64::NAN;
            masked.push(*ts);
        }
    }
    if !masked.is_empty() {
        diagnostics.warn(format!(
            "{label}: masked {} samples equal to flag {flag}: {}",
            masked.len(),
            listing(&masked).join(", ")
        ));
        diagnostics.values_masked.extend(masked);
    }
    TimeSeries::new(label, interval, timestamps, values)
}

fn check_leading_step(series: &TimeSeries, freq: Frequency, diagnostics: &mut Diagnostics) {
    let ts = series.timestamps();
    if ts.len() < 2 {
        return;
    }
    let step = ts[1] - ts[0];
    if step != freq.as_duration() {
        let message = format!(
            "{}: spacing of the first two samples ({}s) does not match the declared frequency ({freq})",
            series.label(),
            step.num_seconds()
        );
        warn!(series = series.label(), "{message}");
        diagnostics.warn(message);
    }
}

fn is_on_grid(series: &TimeSeries, freq: Frequency) -> bool {
    let Some(first) = series.first_timestamp() else {
        return true;
    };
    series
        .timestamps()
        .iter()
        .all(|ts| (*ts - first).num_seconds() % freq.seconds() == 0)
}

/// Removes repeated timestamps, keeping the first occurrence.
fn remove_duplicates(
    series: TimeSeries,
    diagnostics: &mut Diagnostics,
) -> Result<TimeSeries, WevError> {
    let (label, interval, timestamps, values) = series.into_parts();
    let mut kept_ts = Vec::with_capacity(timestamps.len());
    let mut kept_values = Vec::with_capacity(values.len());
    let mut removed = Vec::new();

    for (ts, value) in timestamps.into_iter().zip(values) {
        if kept_ts.last() == Some(&ts) {
            removed.push(ts);
        } else {
            kept_ts.push(ts);
            kept_values.push(value);
        }
    }

    warn!(
        series = label.as_str(),
        count = removed.len(),
        "removing duplicated rows (first occurrence kept)"
    );
    debug!(series = label.as_str(), timestamps = ?listing(&removed), "duplicated rows");
    diagnostics.warn(format!(
        "{label}: removed {} duplicated rows: {}",
        removed.len(),
        listing(&removed).join(", ")
    ));
    diagnostics.duplicates_removed.extend(removed);

    TimeSeries::new(label, interval, kept_ts, kept_values)
}

/// Left-joins the series onto the ideal grid `[first, last]` at `freq`.
///
/// Grid points without a sample become `NaN`; samples off the grid (and any
/// repeated timestamps) are dropped.
fn fill_to_grid(
    series: TimeSeries,
    freq: Frequency,
    max_grid_len: usize,
    diagnostics: &mut Diagnostics,
) -> Result<TimeSeries, WevError> {
    let (label, interval, timestamps, values) = series.into_parts();
    let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
        return TimeSeries::new(label, interval, timestamps, values);
    };

    let steps = (last - first).num_seconds() / freq.seconds();
    let grid_len = match usize::try_from(steps) {
        Ok(steps) if steps < max_grid_len => steps + 1,
        _ => {
            return Err(WevError::non_convergent(format!(
                "series '{label}' spans {} to {}: a {freq} grid would need {} rows \
                 from {} samples (limit {max_grid_len}); check for outlier timestamps",
                format_timestamp(first),
                format_timestamp(last),
                steps.saturating_add(1),
                timestamps.len()
            )))
        }
    };
    let mut grid_ts = Vec::with_capacity(grid_len);
    let mut grid_values = Vec::with_capacity(grid_len);
    let mut filled = Vec::new();
    let mut dropped = Vec::new();

    let mut cursor = 0usize;
    for k in 0..grid_len {
        let point = first + Duration::seconds(freq.seconds() * k as i64);
        while cursor < timestamps.len() && timestamps[cursor] < point {
            dropped.push(timestamps[cursor]);
            cursor += 1;
        }
        if cursor < timestamps.len() && timestamps[cursor] == point {
            grid_ts.push(point);
            grid_values.push(values[cursor]);
            cursor += 1;
            while cursor < timestamps.len() && timestamps[cursor] == point {
                dropped.push(timestamps[cursor]);
                cursor += 1;
            }
        } else {
            grid_ts.push(point);
            grid_values.push(f64::NAN);
            filled.push(point);
        }
    }
    dropped.extend_from_slice(&timestamps[cursor..]);

    if !filled.is_empty() {
        warn!(
            series = label.as_str(),
            count = filled.len(),
            "assigning NaN to missing rows"
        );
        debug!(series = label.as_str(), timestamps = ?listing(&filled), "missing rows");
        diagnostics.warn(format!(
            "{label}: filled {} missing rows with NaN: {}",
            filled.len(),
            listing(&filled).join(", ")
        ));
    }
    if !dropped.is_empty() {
        warn!(
            series = label.as_str(),
            count = dropped.len(),
            "dropping rows off the regular grid"
        );
        diagnostics.warn(format!(
            "{label}: dropped {} rows off the {freq} grid: {}",
            dropped.len(),
            listing(&dropped).join(", ")
        ));
    }
    diagnostics.gaps_filled.extend(filled);
    diagnostics.rows_dropped.extend(dropped);

    TimeSeries::new(label, interval, grid_ts, grid_values)
}

fn listing(timestamps: &[Timestamp]) -> Vec<String> {
    timestamps.iter().copied().map(format_timestamp).collect()
}
