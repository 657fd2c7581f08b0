// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::WevError;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::fmt;

/// Sample timestamp. All series are interpreted in UTC.
pub type Timestamp = DateTime<Utc>;

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parses an RFC 3339 timestamp or a naive `YYYY-MM-DD HH:MM[:SS]` UTC timestamp.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, WevError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(WevError::invalid_input(format!(
        "unable to parse timestamp '{trimmed}'; expected RFC 3339 or YYYY-MM-DD HH:MM[:SS]"
    )))
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Nominal sampling interval, stored in whole seconds.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "FrequencyRepr"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    pub fn from_seconds(seconds: i64) -> Result<Self, WevError> {
        if seconds <= 0 {
            return Err(WevError::invalid_input(format!(
                "frequency must be positive, got {seconds} seconds"
            )));
        }
        Ok(Self { seconds })
    }

    pub fn from_minutes(minutes: u32) -> Result<Self, WevError> {
        Self::from_seconds(i64::from(minutes) * 60)
    }

    pub fn from_duration(duration: Duration) -> Result<Self, WevError> {
        Self::from_seconds(duration.num_seconds())
    }

    pub fn seconds(self) -> i64 {
        self.seconds
    }

    pub fn minutes(self) -> f64 {
        self.seconds as f64 / 60.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::seconds(self.seconds)
    }

    /// Returns true when `self` samples less often than `other`.
    pub fn is_coarser_than(self, other: Frequency) -> bool {
        self.seconds > other.seconds
    }

    /// Number of samples a span implies at this frequency: `(span + freq) / freq`.
    ///
    /// Fractional results mean the span is not a whole number of steps.
    pub fn implied_len(self, span: Duration) -> f64 {
        (span.num_seconds() as f64 + self.seconds as f64) / self.seconds as f64
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds % 3600 == 0 {
            write!(f, "{}h", self.seconds / 3600)
        } else if self.seconds % 60 == 0 {
            write!(f, "{}min", self.seconds / 60)
        } else {
            write!(f, "{}s", self.seconds)
        }
    }
}

/// Inclusive evaluation window `[start, end]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "EvaluationWindowRepr"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvaluationWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl EvaluationWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, WevError> {
        if end < start {
            return Err(WevError::invalid_input(format!(
                "evaluation window end {} precedes start {}",
                format_timestamp(end),
                format_timestamp(start)
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts <= self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// Number of samples the window implies at `freq`, endpoints included.
    pub fn desired_len(&self, freq: Frequency) -> f64 {
        freq.implied_len(self.span())
    }
}

/// Ordered timestamp/value samples for one named variable.
///
/// Values are `f64`; `NaN` marks an explicit gap. Fields are private so that
/// every transformation goes through a stage that returns a new series.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TimeSeriesRepr"))]
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    label: String,
    interval: Frequency,
    timestamps: Vec<Timestamp>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Builds a series, stably sorting samples by timestamp.
    ///
    /// Duplicate timestamps are allowed here and keep their input order; the
    /// verifier is responsible for removing them.
    pub fn new(
        label: impl Into<String>,
        interval: Frequency,
        timestamps: Vec<Timestamp>,
        values: Vec<f64>,
    ) -> Result<Self, WevError> {
        let label = label.into();
        if timestamps.len() != values.len() {
            return Err(WevError::length_mismatch(format!(
                "series '{label}' has {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }

        let sorted = timestamps.windows(2).all(|pair| pair[0] <= pair[1]);
        if sorted {
            return Ok(Self {
                label,
                interval,
                timestamps,
                values,
            });
        }

        let mut samples: Vec<(Timestamp, f64)> = timestamps.into_iter().zip(values).collect();
        samples.sort_by_key(|(ts, _)| *ts);
        let (timestamps, values) = samples.into_iter().unzip();
        Ok(Self {
            label,
            interval,
            timestamps,
            values,
        })
    }

    pub fn from_samples(
        label: impl Into<String>,
        interval: Frequency,
        samples: impl IntoIterator<Item = (Timestamp, f64)>,
    ) -> Result<Self, WevError> {
        let (timestamps, values) = samples.into_iter().unzip();
        Self::new(label, interval, timestamps, values)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn interval(&self) -> Frequency {
        self.interval
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.last().copied()
    }

    pub fn span(&self) -> Option<Duration> {
        Some(self.last_timestamp()? - self.first_timestamp()?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    pub fn nan_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    pub fn has_duplicate_timestamps(&self) -> bool {
        self.timestamps.windows(2).any(|pair| pair[0] == pair[1])
    }

    /// Value at an exact timestamp (first occurrence), if present.
    pub fn value_at(&self, ts: Timestamp) -> Option<f64> {
        let idx = self.timestamps.partition_point(|candidate| *candidate < ts);
        match self.timestamps.get(idx) {
            Some(found) if *found == ts => Some(self.values[idx]),
            _ => None,
        }
    }

    /// Distinct consecutive sample spacings, ascending.
    pub fn distinct_steps(&self) -> Vec<Duration> {
        let mut steps: Vec<Duration> = self
            .timestamps
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect();
        steps.sort();
        steps.dedup();
        steps
    }

    /// Samples within `window`, endpoints included.
    pub fn trim(&self, window: &EvaluationWindow) -> Self {
        let start = self.timestamps.partition_point(|ts| *ts < window.start);
        let end = self.timestamps.partition_point(|ts| *ts <= window.end);
        let end = end.max(start);
        Self {
            label: self.label.clone(),
            interval: self.interval,
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..self
        }
    }

    pub fn with_interval(self, interval: Frequency) -> Self {
        Self { interval, ..self }
    }

    pub fn into_parts(self) -> (String, Frequency, Vec<Timestamp>, Vec<f64>) {
        (self.label, self.interval, self.timestamps, self.values)
    }
}

// Decoded forms are routed through the validating constructors.

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct FrequencyRepr {
    seconds: i64,
}

#[cfg(feature = "serde")]
impl TryFrom<FrequencyRepr> for Frequency {
    type Error = WevError;

    fn try_from(repr: FrequencyRepr) -> Result<Self, Self::Error> {
        Self::from_seconds(repr.seconds)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct EvaluationWindowRepr {
    start: Timestamp,
    end: Timestamp,
}

#[cfg(feature = "serde")]
impl TryFrom<EvaluationWindowRepr> for EvaluationWindow {
    type Error = WevError;

    fn try_from(repr: EvaluationWindowRepr) -> Result<Self, Self::Error> {
        Self::new(repr.start, repr.end)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct TimeSeriesRepr {
    label: String,
    interval: Frequency,
    timestamps: Vec<Timestamp>,
    values: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<TimeSeriesRepr> for TimeSeries {
    type Error = WevError;

    fn try_from(repr: TimeSeriesRepr) -> Result<Self, Self::Error> {
        Self::new(repr.label, repr.interval, repr.timestamps, repr.values)
    }
}
