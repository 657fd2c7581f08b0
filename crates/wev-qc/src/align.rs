// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::resample::{resample, start_of_day, SelectionPolicy};
use std::cmp::Ordering;
use tracing::{info, warn};
use wev_core::{
    format_timestamp, AlignedPair, Diagnostics, EvaluationWindow, Frequency, TimeSeries,
    Timestamp, WevError,
};

/// How series with different frequencies are brought together.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlignMode {
    /// Resample onto right-labelled buckets so values describe the end of
    /// each measurement period.
    #[default]
    BucketEnd,
    /// Never resample; inner-merge on whatever timestamps coincide.
    PlainMerge,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlignConfig {
    pub window: EvaluationWindow,
    pub policy: SelectionPolicy,
    pub mode: AlignMode,
}

impl AlignConfig {
    pub fn new(window: EvaluationWindow) -> Self {
        Self {
            window,
            policy: SelectionPolicy::default(),
            mode: AlignMode::default(),
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_mode(mut self, mode: AlignMode) -> Self {
        self.mode = mode;
        self
    }
}

/// One side of an alignment: a verified series and its target frequency.
#[derive(Clone, Copy, Debug)]
pub struct AlignInput<'a> {
    pub series: &'a TimeSeries,
    pub frequency: Frequency,
}

impl<'a> AlignInput<'a> {
    pub fn new(series: &'a TimeSeries, frequency: Frequency) -> Self {
        Self { series, frequency }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlignOutcome {
    pub pair: AlignedPair,
    pub diagnostics: Diagnostics,
}

/// Trims, resamples and inner-merges a baseline and a comparison series.
///
/// Fails when either series has a non-constant native step, when nothing of
/// either series survives the window, or when the merged index is empty.
pub fn align(
    baseline: AlignInput<'_>,
    comparison: AlignInput<'_>,
    config: &AlignConfig,
) -> Result<AlignOutcome, WevError> {
    let subject = format!(
        "{} vs {}",
        baseline.series.label(),
        comparison.series.label()
    );
    let mut diagnostics = Diagnostics::for_stage("align", subject);

    let base = baseline.series.trim(&config.window);
    let comp = comparison.series.trim(&config.window);
    for side in [&base, &comp] {
        if side.is_empty() {
            return Err(WevError::empty_intersection(format!(
                "series '{}' has no samples between {} and {}",
                side.label(),
                format_timestamp(config.window.start),
                format_timestamp(config.window.end)
            )));
        }
        if side.has_duplicate_timestamps() {
            return Err(WevError::invalid_input(format!(
                "series '{}' has duplicate timestamps; verify it before aligning",
                side.label()
            )));
        }
    }

    let mut base = conform_to_target(base, baseline.frequency, config, &mut diagnostics)?;
    let mut comp = conform_to_target(comp, comparison.frequency, config, &mut diagnostics)?;

    let mut pair_frequency = baseline.frequency.max(comparison.frequency);
    if config.mode == AlignMode::BucketEnd && baseline.frequency != comparison.frequency {
        if baseline.frequency < comparison.frequency {
            base = match_coarser(
                base,
                baseline.frequency,
                &comp,
                comparison.frequency,
                config,
                &mut diagnostics,
            )?;
        } else {
            comp = match_coarser(
                comp,
                comparison.frequency,
                &base,
                baseline.frequency,
                config,
                &mut diagnostics,
            )?;
        }
    }

    let (timestamps, base_values, comp_values) = inner_merge(&base, &comp);
    if timestamps.is_empty() {
        return Err(WevError::empty_intersection(format!(
            "'{}' and '{}' share no timestamps within the evaluation window",
            base.label(),
            comp.label()
        )));
    }
    if config.mode == AlignMode::PlainMerge && timestamps.len() >= 2 {
        if let Ok(spacing) = Frequency::from_duration(timestamps[1] - timestamps[0]) {
            pair_frequency = spacing;
        }
    }

    let pair = AlignedPair::new(
        base.label(),
        comp.label(),
        pair_frequency,
        timestamps,
        base_values,
        comp_values,
    )?;
    check_desired_length(&pair, config, &mut diagnostics);
    diagnostics.final_len = Some(pair.len());

    Ok(AlignOutcome { pair, diagnostics })
}

/// Checks the native step and resamples to the target when it is coarser.
fn conform_to_target(
    series: TimeSeries,
    target: Frequency,
    config: &AlignConfig,
    diagnostics: &mut Diagnostics,
) -> Result<TimeSeries, WevError> {
    let steps = series.distinct_steps();
    let native = match steps.as_slice() {
        [] => return Ok(series.with_interval(target)),
        [single] => Frequency::from_duration(*single)?,
        many => {
            let listed: Vec<String> = many
                .iter()
                .map(|step| format!("{}s", step.num_seconds()))
                .collect();
            return Err(WevError::non_constant_step(format!(
                "series '{}' has steps [{}]",
                series.label(),
                listed.join(", ")
            )));
        }
    };

    if config.mode == AlignMode::PlainMerge {
        return Ok(series);
    }

    if target.is_coarser_than(native) {
        let Some(first) = series.first_timestamp() else {
            return Ok(series);
        };
        let message = format!(
            "resampling {} every {target} using the {} method",
            series.label(),
            config.policy.as_str()
        );
        info!(series = series.label(), "{message}");
        diagnostics.note(message);
        return resample(&series, target, start_of_day(first), config.policy);
    }

    if native.is_coarser_than(target) {
        let message = format!(
            "{}: native step {native} is coarser than the declared {target}; left as is",
            series.label()
        );
        warn!(series = series.label(), "{message}");
        diagnostics.warn(message);
    }
    Ok(series)
}

/// Resamples the finer series onto the coarser one's frequency, anchoring
/// bucket edges at the coarser series' first timestamp.
fn match_coarser(
    finer: TimeSeries,
    finer_freq: Frequency,
    coarser: &TimeSeries,
    coarser_freq: Frequency,
    config: &AlignConfig,
    diagnostics: &mut Diagnostics,
) -> Result<TimeSeries, WevError> {
    let Some(origin) = coarser.first_timestamp() else {
        return Ok(finer);
    };
    let message = format!(
        "aligning the {finer_freq} {} data to the {coarser_freq} {} data at the end of each period using the {} method",
        finer.label(),
        coarser.label(),
        config.policy.as_str()
    );
    info!("{message}");
    diagnostics.note(message);
    resample(&finer, coarser_freq, origin, config.policy)
}

fn inner_merge(base: &TimeSeries, comp: &TimeSeries) -> (Vec<Timestamp>, Vec<f64>, Vec<f64>) {
    let (bt, bv) = (base.timestamps(), base.values());
    let (ct, cv) = (comp.timestamps(), comp.values());
    let capacity = bt.len().min(ct.len());
    let mut timestamps = Vec::with_capacity(capacity);
    let mut base_values = Vec::with_capacity(capacity);
    let mut comp_values = Vec::with_capacity(capacity);

    let (mut i, mut j) = (0usize, 0usize);
    while i < bt.len() && j < ct.len() {
        match bt[i].cmp(&ct[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                timestamps.push(bt[i]);
                base_values.push(bv[i]);
                comp_values.push(cv[j]);
                i += 1;
                j += 1;
            }
        }
    }

    (timestamps, base_values, comp_values)
}

fn check_desired_length(pair: &AlignedPair, config: &AlignConfig, diagnostics: &mut Diagnostics) {
    let (Some(&first), Some(&last)) = (pair.timestamps().first(), pair.timestamps().last()) else {
        return;
    };
    let freq = pair.frequency();
    info!(
        baseline = pair.baseline_label(),
        comparison = pair.comparison_label(),
        from = %format_timestamp(first),
        to = %format_timestamp(last),
        every = %freq,
        len = pair.len(),
        "evaluating aligned pair"
    );

    if last - first != config.window.span() {
        let message = format!(
            "evaluation window {} to {} does not match data span {} to {}",
            format_timestamp(config.window.start),
            format_timestamp(config.window.end),
            format_timestamp(first),
            format_timestamp(last)
        );
        warn!("{message}");
        diagnostics.warn(message);
    }

    let desired = config.window.desired_len(freq);
    diagnostics.desired_len = Some(desired);
    if pair.len() as f64 != desired {
        let message = format!(
            "aligned pair has {} time steps but the evaluation window implies {desired} at {freq}",
            pair.len()
        );
        warn!("{message}");
        diagnostics.warn(message);
    }
}
