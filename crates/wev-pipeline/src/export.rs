// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::runner::{CombinationKey, RunReport};
use crate::source::format_level;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use wev_core::{format_timestamp, WevError};

const KEY_COLUMNS: [&str; 3] = ["level", "dataset", "variable"];
const RAMP_KEY_COLUMNS: [&str; 2] = ["ramp_nature", "ramp_method"];

/// `variable` key of metrics computed on derived power.
pub const POWER_VARIABLE: &str = "power";

fn csv_error(path: &Path, err: csv::Error) -> WevError {
    WevError::io(format!("failed to write '{}': {err}", path.display()))
}

fn key_fields(key: &CombinationKey) -> [String; 3] {
    [
        format_level(key.level),
        key.dataset.clone(),
        key.variable.clone(),
    ]
}

fn number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

struct TableWriter {
    path: PathBuf,
    inner: csv::Writer<fs::File>,
}

impl TableWriter {
    fn create(dir: &Path, name: &str, header: &[&str]) -> Result<Self, WevError> {
        let path = dir.join(name);
        let mut inner = csv::Writer::from_path(&path).map_err(|err| csv_error(&path, err))?;
        inner
            .write_record(header)
            .map_err(|err| csv_error(&path, err))?;
        Ok(Self { path, inner })
    }

    fn row<I, T>(&mut self, fields: I) -> Result<(), WevError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.inner
            .write_record(fields)
            .map_err(|err| csv_error(&self.path, err))
    }

    fn finish(mut self) -> Result<PathBuf, WevError> {
        self.inner
            .flush()
            .map_err(|err| WevError::io(format!("failed to flush '{}': {err}", self.path.display())))?;
        Ok(self.path)
    }
}

fn header<'a>(ramp_keys: bool, rest: &[&'a str]) -> Vec<&'a str> {
    let mut columns: Vec<&str> = KEY_COLUMNS.to_vec();
    if ramp_keys {
        columns.extend(RAMP_KEY_COLUMNS);
    }
    columns.extend_from_slice(rest);
    columns
}

/// Writes the long-format tables for a run into `dir`:
/// `ts_<org>.csv`, `metrics_<org>.csv`, and when ramp definitions are
/// configured `ramp_<org>.csv` and `ramp_ts_<org>.csv`.
///
/// Every row leads with its composite key; undefined statistics are empty cells.
pub fn write_report_tables(report: &RunReport, dir: &Path, org: &str) -> Result<Vec<PathBuf>, WevError> {
    fs::create_dir_all(dir)
        .map_err(|err| WevError::io(format!("failed to create '{}': {err}", dir.display())))?;
    let mut written = Vec::new();

    let mut ts = TableWriter::create(
        dir,
        &format!("ts_{org}.csv"),
        &header(false, &["time", "baseline", "comparison"]),
    )?;
    for result in &report.results {
        let key = key_fields(&result.key);
        let pair = &result.pair;
        for ((t, b), c) in pair
            .timestamps()
            .iter()
            .zip(pair.baseline())
            .zip(pair.comparison())
        {
            ts.row(
                key.iter()
                    .cloned()
                    .chain([format_timestamp(*t), number(*b), number(*c)]),
            )?;
        }
    }
    written.push(ts.finish()?);

    let mut metrics = TableWriter::create(
        dir,
        &format!("metrics_{org}.csv"),
        &header(false, &["metric", "value"]),
    )?;
    for result in &report.results {
        let key = key_fields(&result.key);
        for metric in &result.metrics {
            metrics.row(
                key.iter()
                    .cloned()
                    .chain([metric.metric.as_str().to_string(), number(metric.value)]),
            )?;
        }
        let [level, dataset, _] = key;
        for metric in &result.power_metrics {
            metrics.row([
                level.clone(),
                dataset.clone(),
                POWER_VARIABLE.to_string(),
                metric.metric.as_str().to_string(),
                number(metric.value),
            ])?;
        }
    }
    written.push(metrics.finish()?);

    // Ramp tables follow the configuration, so a run whose combinations all
    // failed still writes them (header only).
    if report.ramp_methods.is_empty() {
        info!(files = written.len(), dir = %dir.display(), "wrote report tables");
        return Ok(written);
    }

    let mut stats = TableWriter::create(
        dir,
        &format!("ramp_{org}.csv"),
        &header(true, &["statistic", "value"]),
    )?;
    let mut flags = TableWriter::create(
        dir,
        &format!("ramp_ts_{org}.csv"),
        &header(
            true,
            &[
                "time",
                "base_delta",
                "comp_delta",
                "base_ramp",
                "comp_ramp",
                "category",
            ],
        ),
    )?;
    for result in &report.results {
        let key = key_fields(&result.key);
        for ramp in &result.ramps {
            let ramp_key = [ramp.nature.as_str().to_string(), ramp.method.clone()];
            for (name, value) in &ramp.summary {
                stats.row(
                    key.iter()
                        .chain(ramp_key.iter())
                        .cloned()
                        .chain([name.clone(), number(*value)]),
                )?;
            }
            let f = &ramp.flags;
            for (i, t) in f.timestamps.iter().enumerate() {
                flags.row(key.iter().chain(ramp_key.iter()).cloned().chain([
                    format_timestamp(*t),
                    number(f.baseline_delta[i]),
                    number(f.comparison_delta[i]),
                    u8::from(f.baseline[i]).to_string(),
                    u8::from(f.comparison[i]).to_string(),
                    ramp.table.categories[i].as_str().to_string(),
                ]))?;
            }
        }
    }
    written.push(stats.finish()?);
    written.push(flags.finish()?);

    info!(files = written.len(), dir = %dir.display(), "wrote report tables");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::{header, number, write_report_tables};
    use crate::runner::{CombinationFailure, CombinationKey, RunReport};
    use std::fs;

    #[test]
    fn headers_lead_with_composite_key() {
        assert_eq!(
            header(true, &["statistic", "value"]),
            vec!["level", "dataset", "variable", "ramp_nature", "ramp_method", "statistic", "value"]
        );
        assert_eq!(header(false, &["metric"]), vec!["level", "dataset", "variable", "metric"]);
    }

    #[test]
    fn nan_is_an_empty_cell() {
        assert_eq!(number(f64::NAN), "");
        assert_eq!(number(0.25), "0.25");
    }

    #[test]
    fn ramp_tables_follow_configured_definitions_even_when_all_failed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = RunReport {
            location: "site".to_string(),
            variable: "wind speed".to_string(),
            baseline: "lidar".to_string(),
            ramp_methods: vec!["r_magnitude_2ms-1_2h".to_string()],
            results: vec![],
            failures: vec![CombinationFailure {
                key: CombinationKey {
                    level: 100.0,
                    dataset: "wrf".to_string(),
                    variable: "ws_wrf".to_string(),
                },
                code: "missing_data",
                message: "no file".to_string(),
            }],
        };

        let written = write_report_tables(&report, dir.path(), "x").expect("tables written");
        let names: Vec<String> = written
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["ts_x.csv", "metrics_x.csv", "ramp_x.csv", "ramp_ts_x.csv"]);
        let ramp = fs::read_to_string(dir.path().join("ramp_x.csv")).expect("read ramp table");
        assert_eq!(
            ramp.trim_end(),
            "level,dataset,variable,ramp_nature,ramp_method,statistic,value"
        );

        let no_ramps = RunReport {
            ramp_methods: vec![],
            ..report
        };
        let other = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            write_report_tables(&no_ramps, other.path(), "x")
                .expect("tables written")
                .len(),
            2
        );
    }
}
