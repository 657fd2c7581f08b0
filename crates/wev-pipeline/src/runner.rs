// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::{DatasetSpec, EvaluationConfig};
use crate::source::{open_source, read_power_curve, SeriesSource};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};
use wev_core::{format_timestamp, AlignedPair, Diagnostics, WevError};
use wev_eval::{
    angle_difference_series, derive_power, ContingencyTable, MetricFunction, MetricKind,
    MetricValue, PowerCurve,
};
use wev_qc::{align, verify, AlignConfig, AlignInput, VerifiedSeries};
use wev_ramps::{DynRampClassifier, RampFlags, RampNature};

/// Identifies one (level, comparison dataset) evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CombinationKey {
    pub level: f64,
    pub dataset: String,
    pub variable: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricResult {
    pub metric: MetricKind,
    pub value: f64,
    pub masked: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RampResult {
    pub nature: RampNature,
    pub method: String,
    pub summary: Vec<(String, f64)>,
    #[serde(skip)]
    pub flags: RampFlags,
    #[serde(skip)]
    pub table: ContingencyTable,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CombinationResult {
    pub key: CombinationKey,
    pub rows: usize,
    pub rows_used: usize,
    pub metrics: Vec<MetricResult>,
    /// Metrics on power derived from the power curve; only at the hub height
    /// and only when both datasets are wind speeds.
    pub power_metrics: Vec<MetricResult>,
    pub ramps: Vec<RampResult>,
    pub diagnostics: Vec<Diagnostics>,
    /// Aligned series before incomplete rows were removed.
    #[serde(skip)]
    pub pair: AlignedPair,
}

/// A combination that aborted on a fatal input error.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CombinationFailure {
    pub key: CombinationKey,
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub location: String,
    pub variable: String,
    pub baseline: String,
    /// Method names of the configured ramp definitions, whether or not any
    /// combination got as far as classifying ramps.
    pub ramp_methods: Vec<String>,
    pub results: Vec<CombinationResult>,
    pub failures: Vec<CombinationFailure>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything a combination needs that does not change across levels.
struct RunContext<'a> {
    config: &'a EvaluationConfig,
    align: AlignConfig,
    base_source: Box<dyn SeriesSource + Send + Sync>,
    comp_sources: Vec<Box<dyn SeriesSource + Send + Sync>>,
    classifiers: Vec<DynRampClassifier>,
    power_curve: Option<PowerCurve>,
}

type Outcome = Result<CombinationResult, CombinationFailure>;

/// Runs every height level x comparison dataset x ramp definition.
///
/// Configuration problems fail the whole run; input problems abort only the
/// affected (level, dataset) combination and are listed in the report.
pub fn run_evaluation(config: &EvaluationConfig, base_dir: &Path) -> Result<RunReport, WevError> {
    config.validate()?;

    let classifiers = config
        .ramps
        .iter()
        .map(|definition| definition.build(&config.reference.units))
        .collect::<Result<Vec<_>, _>>()?;
    let comp_sources = config
        .comp
        .iter()
        .map(|dataset| open_source(dataset, base_dir))
        .collect::<Result<Vec<_>, _>>()?;
    let power_curve = config
        .power_curve
        .as_ref()
        .map(|spec| read_power_curve(spec, base_dir))
        .transpose()?;
    if let Some(spec) = &config.power_curve {
        for dataset in config.comp.iter().filter(|d| !config.derives_power_for(d)) {
            info!(
                dataset = %dataset.name,
                hub_height = spec.hub_height,
                "not deriving power: both datasets must be wind speeds and the hub height an evaluated level"
            );
        }
    }
    let ctx = RunContext {
        config,
        align: config.align_config()?,
        base_source: open_source(&config.base, base_dir)?,
        comp_sources,
        classifiers,
        power_curve,
    };

    info!(
        location = %config.location,
        variable = %config.reference.var,
        start = %format_timestamp(config.window.start),
        end = %format_timestamp(config.window.end),
        levels = config.levels.heights.len(),
        datasets = config.comp.len(),
        "starting evaluation"
    );

    let per_level = evaluate_levels(&ctx, &config.levels.heights);

    let mut report = RunReport {
        location: config.location.clone(),
        variable: config.reference.var.clone(),
        baseline: config.base.name.clone(),
        ramp_methods: ctx
            .classifiers
            .iter()
            .map(|classifier| classifier.method_name())
            .collect(),
        results: Vec::new(),
        failures: Vec::new(),
    };
    for outcome in per_level.into_iter().flatten() {
        match outcome {
            Ok(result) => report.results.push(result),
            Err(failure) => report.failures.push(failure),
        }
    }

    info!(
        completed = report.results.len(),
        failed = report.failures.len(),
        "evaluation finished"
    );
    Ok(report)
}

#[cfg(feature = "rayon")]
fn evaluate_levels(ctx: &RunContext<'_>, levels: &[f64]) -> Vec<Vec<Outcome>> {
    use rayon::prelude::*;
    levels
        .par_iter()
        .map(|level| evaluate_level(ctx, *level))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn evaluate_levels(ctx: &RunContext<'_>, levels: &[f64]) -> Vec<Vec<Outcome>> {
    levels
        .iter()
        .map(|level| evaluate_level(ctx, *level))
        .collect()
}

fn key_for(level: f64, dataset: &DatasetSpec) -> CombinationKey {
    CombinationKey {
        level,
        dataset: dataset.name.clone(),
        variable: dataset.target_var.clone(),
    }
}

fn failure(key: CombinationKey, err: &WevError) -> CombinationFailure {
    warn!(
        level = key.level,
        dataset = %key.dataset,
        code = err.code(),
        error = %err,
        "combination aborted"
    );
    CombinationFailure {
        key,
        code: err.code(),
        message: err.to_string(),
    }
}

fn evaluate_level(ctx: &RunContext<'_>, level: f64) -> Vec<Outcome> {
    let config = ctx.config;
    info!(level, units = %config.levels.units, "evaluating level");

    let base = ctx
        .base_source
        .get_ts(level)
        .and_then(|series| verify(series, &config.verify_config(&config.base)?));
    let base = match base {
        Ok(base) => base,
        Err(err) => {
            return config
                .comp
                .iter()
                .map(|dataset| Err(failure(key_for(level, dataset), &err)))
                .collect();
        }
    };

    config
        .comp
        .iter()
        .zip(&ctx.comp_sources)
        .map(|(dataset, source)| {
            evaluate_combination(ctx, level, &base, dataset, source.as_ref())
                .map_err(|err| failure(key_for(level, dataset), &err))
        })
        .collect()
}

fn evaluate_combination(
    ctx: &RunContext<'_>,
    level: f64,
    base: &VerifiedSeries,
    dataset: &DatasetSpec,
    source: &(dyn SeriesSource + Send + Sync),
) -> Result<CombinationResult, WevError> {
    let config = ctx.config;
    let key = key_for(level, dataset);

    let comp = verify(source.get_ts(level)?, &config.verify_config(dataset)?)?;
    let aligned = align(
        AlignInput::new(&base.series, config.base.frequency()?),
        AlignInput::new(&comp.series, dataset.frequency()?),
        &ctx.align,
    )?;

    let mut combo_diag = Diagnostics::for_stage(
        "evaluate",
        format!("{} vs {} at {level}", config.base.name, dataset.name),
    );
    let (clean, dropped) = aligned.pair.drop_incomplete();
    if !dropped.is_empty() {
        debug!(
            dropped = ?dropped.iter().map(|ts| format_timestamp(*ts)).collect::<Vec<_>>(),
            "rows with NaN removed"
        );
        combo_diag.warn(format!(
            "removed {} rows containing NaN; {} rows remain",
            dropped.len(),
            clean.len()
        ));
        combo_diag.rows_dropped = dropped;
    }

    let wind_direction = config.base.is_wind_direction() && dataset.is_wind_direction();
    let metrics = compute_metrics(&config.metrics, &clean, wind_direction, &mut combo_diag)?;
    let power_metrics = match hub_power_curve(ctx, level, dataset) {
        Some(curve) => power_metrics(&config.metrics, curve, &clean, &mut combo_diag)?,
        None => Vec::new(),
    };

    let mut ramps = Vec::with_capacity(ctx.classifiers.len());
    for classifier in &ctx.classifiers {
        let flags = classifier.classify(&clean);
        let table = ContingencyTable::from_flags(&flags.baseline, &flags.comparison)?;
        debug!(method = %classifier.method_name(), "2x2 contingency table:\n{table}");
        ramps.push(RampResult {
            nature: classifier.nature(),
            method: classifier.method_name(),
            summary: table
                .summary()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            flags,
            table,
        });
    }

    info!(
        level,
        dataset = %dataset.name,
        rows = aligned.pair.len(),
        rows_used = clean.len(),
        ramps = ramps.len(),
        "combination evaluated"
    );

    Ok(CombinationResult {
        key,
        rows: aligned.pair.len(),
        rows_used: clean.len(),
        metrics,
        power_metrics,
        ramps,
        diagnostics: vec![
            base.diagnostics.clone(),
            comp.diagnostics,
            aligned.diagnostics,
            combo_diag,
        ],
        pair: aligned.pair,
    })
}

fn hub_power_curve<'a>(
    ctx: &'a RunContext<'_>,
    level: f64,
    dataset: &DatasetSpec,
) -> Option<&'a PowerCurve> {
    let spec = ctx.config.power_curve.as_ref()?;
    if spec.hub_height == level && ctx.config.derives_power_for(dataset) {
        ctx.power_curve.as_ref()
    } else {
        None
    }
}

/// Converts both wind-speed columns to power and applies each metric.
fn power_metrics(
    kinds: &[MetricKind],
    curve: &PowerCurve,
    pair: &AlignedPair,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<MetricResult>, WevError> {
    let power = AlignedPair::new(
        format!("{} power", pair.baseline_label()),
        format!("{} power", pair.comparison_label()),
        pair.frequency(),
        pair.timestamps().to_vec(),
        derive_power(curve, pair.baseline()),
        derive_power(curve, pair.comparison()),
    )?;
    diagnostics.note(format!(
        "derived power from a {}-bin power curve for {} rows",
        curve.len(),
        power.len()
    ));
    compute_metrics(kinds, &power, false, diagnostics)
}

/// Applies each metric to the NaN-free pair. Wind directions are scored on
/// their angular difference against a zero baseline.
fn compute_metrics(
    kinds: &[MetricKind],
    pair: &AlignedPair,
    wind_direction: bool,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<MetricResult>, WevError> {
    let (x, y) = if wind_direction {
        diagnostics.note("metrics use wind-direction differences of unit vectors");
        let y = angle_difference_series(pair.baseline(), pair.comparison());
        (vec![0.0; y.len()], y)
    } else {
        (pair.baseline().to_vec(), pair.comparison().to_vec())
    };

    kinds
        .iter()
        .map(|kind| {
            let MetricValue { value, masked } = kind.compute(&x, &y)?;
            if masked > 0 {
                diagnostics.warn(format!(
                    "{}: ignored {masked} rows with undefined ratios",
                    kind.as_str()
                ));
            }
            Ok(MetricResult {
                metric: *kind,
                value,
                masked,
            })
        })
        .collect()
}
