// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::{Duration, TimeZone, Utc};
use wev_core::{Frequency, TimeSeries, Timestamp, WevError};

/// How a resampled bucket's representative value is chosen.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Arithmetic mean of the finite samples inside the bucket.
    Average,
    /// The sample sitting exactly on the bucket label.
    #[default]
    Instance,
}

impl SelectionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Instance => "instance",
        }
    }
}

/// Midnight (UTC) of the day holding `ts`; the default bucket origin.
pub fn start_of_day(ts: Timestamp) -> Timestamp {
    let date = ts.date_naive();
    match date.and_hms_opt(0, 0, 0) {
        Some(midnight) => Utc.from_utc_datetime(&midnight),
        None => ts,
    }
}

/// Resamples `series` into right-closed, right-labelled buckets of width
/// `target`, with bucket edges at `origin + k * target`.
///
/// A sample at `t` lands in the bucket labelled by the smallest edge `>= t`.
/// Every label between the first and last occupied bucket is emitted, so empty
/// buckets surface as `NaN`.
pub fn resample(
    series: &TimeSeries,
    target: Frequency,
    origin: Timestamp,
    policy: SelectionPolicy,
) -> Result<TimeSeries, WevError> {
    let (Some(first), Some(last)) = (series.first_timestamp(), series.last_timestamp()) else {
        return Ok(series.clone().with_interval(target));
    };

    let width = target.seconds();
    let origin_s = origin.timestamp();
    let bucket_of = |ts: Timestamp| ceil_div(ts.timestamp() - origin_s, width);
    let first_bucket = bucket_of(first);
    let last_bucket = bucket_of(last);
    let label_at = |k: i64| origin + Duration::seconds(k * width);

    let bucket_count = usize::try_from(last_bucket - first_bucket + 1).map_err(|_| {
        WevError::invalid_input(format!(
            "cannot resample '{}': bucket range is inverted",
            series.label()
        ))
    })?;

    let mut timestamps = Vec::with_capacity(bucket_count);
    let mut values = Vec::with_capacity(bucket_count);

    match policy {
        SelectionPolicy::Average => {
            let mut sums = vec![0.0f64; bucket_count];
            let mut counts = vec![0usize; bucket_count];
            for (ts, value) in series.iter() {
                if value.is_nan() {
                    continue;
                }
                let slot = (bucket_of(ts) - first_bucket) as usize;
                sums[slot] += value;
                counts[slot] += 1;
            }
            for (offset, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
                timestamps.push(label_at(first_bucket + offset as i64));
                values.push(if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                });
            }
        }
        SelectionPolicy::Instance => {
            for k in first_bucket..=last_bucket {
                let label = label_at(k);
                timestamps.push(label);
                values.push(series.value_at(label).unwrap_or(f64::NAN));
            }
        }
    }

    TimeSeries::new(series.label(), target, timestamps, values)
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    -((-numerator).div_euclid(denominator))
}
