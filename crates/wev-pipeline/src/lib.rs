// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Batch evaluation: configuration, series sources, the per-combination
//! runner and long-format delimited export.

pub mod config;
pub mod export;
pub mod runner;
pub mod source;

pub use config::{
    DatasetSpec, EvaluationConfig, LevelSpec, OutputSpec, PowerCurveSpec, ReferenceSpec,
    SelectData, SourceSpec, VerifySpec, WindowSpec,
};
pub use export::{write_report_tables, POWER_VARIABLE};
pub use runner::{
    run_evaluation, CombinationFailure, CombinationKey, CombinationResult, MetricResult,
    RampResult, RunReport,
};
pub use source::{
    format_level, open_source, read_csv_series, read_power_curve, CsvSource, SeriesSource,
};

use std::path::{Path, PathBuf};
use wev_core::WevError;

/// Runs the evaluation and, when `output.writing` is set, writes the report
/// tables. `output_override` replaces the configured output directory.
///
/// Relative paths resolve against `base_dir`.
pub fn run_and_export(
    config: &EvaluationConfig,
    base_dir: &Path,
    output_override: Option<&Path>,
) -> Result<(RunReport, Vec<PathBuf>), WevError> {
    let report = run_evaluation(config, base_dir)?;

    let target = match (output_override, &config.output) {
        (Some(dir), output) => Some((
            dir.to_path_buf(),
            output
                .as_ref()
                .map(|o| o.org.clone())
                .unwrap_or_else(|| "wev".to_string()),
        )),
        (None, Some(output)) if output.writing => {
            Some((base_dir.join(&output.path), output.org.clone()))
        }
        (None, _) => None,
    };

    let written = match target {
        Some((dir, org)) => write_report_tables(&report, &dir, &org)?,
        None => Vec::new(),
    };
    Ok((report, written))
}
