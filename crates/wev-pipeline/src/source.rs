// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::{DatasetSpec, PowerCurveSpec, SourceSpec};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use wev_core::{parse_timestamp, Frequency, TimeSeries, WevError};
use wev_eval::PowerCurve;

/// Time column names recognised when none is configured, in lookup order.
pub const TIME_COLUMN_CANDIDATES: [&str; 3] = ["Date & Time (UTC)", "time (UTC)", "time"];

const MISSING_MARKERS: [&str; 5] = ["", "nan", "NaN", "NA", "null"];

/// Produces the series of one dataset at a given height.
pub trait SeriesSource {
    fn get_ts(&self, level: f64) -> Result<TimeSeries, WevError>;
}

/// Renders a height the way column templates expect it: `100`, `40.5`.
pub fn format_level(level: f64) -> String {
    format!("{level}")
}

/// Reads one value column of a delimited file into a time-sorted series.
pub fn read_csv_series(
    path: &Path,
    time_column: Option<&str>,
    value_column: &str,
    label: &str,
    frequency: Frequency,
) -> Result<TimeSeries, WevError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| WevError::io(format!("failed to open '{}': {err}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|err| WevError::io(format!("failed to read header of '{}': {err}", path.display())))?
        .clone();

    let time_idx = match time_column {
        Some(name) => headers.iter().position(|h| h == name),
        None => TIME_COLUMN_CANDIDATES
            .iter()
            .find_map(|candidate| headers.iter().position(|h| h == *candidate)),
    }
    .ok_or_else(|| {
        WevError::missing_data(format!(
            "'{}' has no time column (looked for {})",
            path.display(),
            time_column
                .map(|name| format!("'{name}'"))
                .unwrap_or_else(|| TIME_COLUMN_CANDIDATES.join(", "))
        ))
    })?;

    let value_idx = headers
        .iter()
        .position(|h| h == value_column)
        .ok_or_else(|| {
            WevError::missing_data(format!(
                "'{}' has no column named '{value_column}'",
                path.display()
            ))
        })?;

    let mut samples = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|err| {
            WevError::io(format!("failed to read '{}' row {}: {err}", path.display(), row + 1))
        })?;
        let raw_time = record.get(time_idx).unwrap_or_default();
        let ts = parse_timestamp(raw_time).map_err(|err| {
            WevError::invalid_input(format!("'{}' row {}: {err}", path.display(), row + 1))
        })?;
        let raw_value = record.get(value_idx).unwrap_or_default();
        let value = if MISSING_MARKERS.contains(&raw_value) {
            f64::NAN
        } else {
            raw_value.parse::<f64>().map_err(|_| {
                WevError::invalid_input(format!(
                    "'{}' row {}: value '{raw_value}' in column '{value_column}' is not a number",
                    path.display(),
                    row + 1
                ))
            })?
        };
        samples.push((ts, value));
    }

    debug!(
        path = %path.display(),
        column = value_column,
        rows = samples.len(),
        "read delimited series"
    );
    TimeSeries::from_samples(label, frequency, samples)
}

/// Delimited-text source for one dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct CsvSource {
    path: PathBuf,
    column_template: String,
    time_column: Option<String>,
    label: String,
    frequency: Frequency,
}

impl CsvSource {
    pub fn new(
        path: impl Into<PathBuf>,
        column_template: impl Into<String>,
        time_column: Option<String>,
        label: impl Into<String>,
        frequency: Frequency,
    ) -> Self {
        Self {
            path: path.into(),
            column_template: column_template.into(),
            time_column,
            label: label.into(),
            frequency,
        }
    }

    pub fn column_for(&self, level: f64) -> String {
        self.column_template.replace("{level}", &format_level(level))
    }

    /// The file to read: the path itself, or the single `.csv` file inside a
    /// directory.
    fn resolve_file(&self) -> Result<PathBuf, WevError> {
        if !self.path.exists() {
            return Err(WevError::missing_data(format!(
                "source path '{}' does not exist",
                self.path.display()
            )));
        }
        if !self.path.is_dir() {
            return Ok(self.path.clone());
        }

        let entries = fs::read_dir(&self.path).map_err(|err| {
            WevError::io(format!("failed to list '{}': {err}", self.path.display()))
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                WevError::io(format!("failed to list '{}': {err}", self.path.display()))
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
                files.push(path);
            }
        }
        match files.len() {
            1 => Ok(files.remove(0)),
            count => Err(WevError::missing_data(format!(
                "expected exactly one .csv file in '{}', found {count}",
                self.path.display()
            ))),
        }
    }
}

impl SeriesSource for CsvSource {
    fn get_ts(&self, level: f64) -> Result<TimeSeries, WevError> {
        let file = self.resolve_file()?;
        read_csv_series(
            &file,
            self.time_column.as_deref(),
            &self.column_for(level),
            &self.label,
            self.frequency,
        )
    }
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize, WevError> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        WevError::missing_data(format!("'{}' has no column named '{name}'", path.display()))
    })
}

/// Reads a power curve from the `ws` and `power` columns of a delimited file.
pub fn read_power_curve(spec: &PowerCurveSpec, base_dir: &Path) -> Result<PowerCurve, WevError> {
    let path = base_dir.join(&spec.path);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(|err| WevError::io(format!("failed to open '{}': {err}", path.display())))?;
    let headers = reader
        .headers()
        .map_err(|err| WevError::io(format!("failed to read header of '{}': {err}", path.display())))?
        .clone();
    let ws_idx = column_index(&headers, &spec.ws, &path)?;
    let power_idx = column_index(&headers, &spec.power, &path)?;

    let mut speeds = Vec::new();
    let mut power = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|err| {
            WevError::io(format!("failed to read '{}' row {}: {err}", path.display(), row + 1))
        })?;
        for (idx, column, out) in [
            (ws_idx, &spec.ws, &mut speeds),
            (power_idx, &spec.power, &mut power),
        ] {
            let raw = record.get(idx).unwrap_or_default();
            let value = raw.parse::<f64>().map_err(|_| {
                WevError::invalid_input(format!(
                    "'{}' row {}: value '{raw}' in column '{column}' is not a number",
                    path.display(),
                    row + 1
                ))
            })?;
            out.push(value);
        }
    }

    debug!(path = %path.display(), bins = speeds.len(), "read power curve");
    PowerCurve::new(speeds, power)
}

/// Builds the source for a dataset; relative paths resolve against `base_dir`.
pub fn open_source(
    dataset: &DatasetSpec,
    base_dir: &Path,
) -> Result<Box<dyn SeriesSource + Send + Sync>, WevError> {
    let frequency = dataset.frequency()?;
    match &dataset.source {
        SourceSpec::Csv {
            path,
            column,
            time_column,
            ..
        } => Ok(Box::new(CsvSource::new(
            base_dir.join(path),
            column.clone(),
            time_column.clone(),
            dataset.target_var.clone(),
            frequency,
        ))),
    }
}
