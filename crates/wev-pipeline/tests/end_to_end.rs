// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use wev_eval::MetricKind;
use wev_pipeline::{run_and_export, run_evaluation, EvaluationConfig, PowerCurveSpec};
use wev_ramps::RampNature;

const BASELINE: [f64; 14] = [
    60.0, 59.0, 40.0, 41.0, 42.0, 43.0, 20.0, 21.0, 40.0, 42.0, 40.0, 42.0, 50.0, 52.0,
];
const COMPARISON: [f64; 14] = [
    20.0, 21.0, 22.0, 23.0, 40.0, 41.0, 40.0, 41.0, 60.0, 62.0, 60.0, 62.0, 60.0, 62.0,
];

fn write_hourly_inputs(dir: &Path) {
    let mut base = String::from("time (UTC),ws_100m,ws_40m\n");
    for (h, v) in BASELINE.iter().enumerate() {
        writeln!(base, "2020-10-31 {h:02}:00:00,{v},{}", v / 2.0).expect("format row");
        if h == 3 {
            // Duplicate with a conflicting value; the first occurrence wins.
            writeln!(base, "2020-10-31 03:00:00,999,999").expect("format row");
        }
    }
    fs::write(dir.join("base.csv"), base).expect("write baseline");

    fs::create_dir(dir.join("model")).expect("create model dir");
    let mut comp = String::from("Date & Time (UTC),speed_100\n");
    for (h, v) in COMPARISON.iter().enumerate().rev() {
        writeln!(comp, "2020-10-31T{h:02}:00:00Z,{v}").expect("format row");
    }
    fs::write(dir.join("model").join("run.csv"), comp).expect("write comparison");
}

fn hourly_config() -> EvaluationConfig {
    EvaluationConfig::from_json_str(
        r#"{
            "location": "test site",
            "window": {"start": "2020-10-31 00:00", "end": "2020-10-31 13:00"},
            "reference": {"var": "wind speed", "units": "ms-1"},
            "levels": {"heights": [100, 40], "units": "m"},
            "base": {
                "name": "mast",
                "source": {"kind": "csv", "path": "base.csv", "column": "ws_{level}m"},
                "freq_minutes": 60,
                "nature": "ws",
                "target_var": "ws_mast"
            },
            "comp": [{
                "name": "model",
                "source": {"kind": "csv", "path": "model", "column": "speed_{level}"},
                "freq_minutes": 60,
                "nature": "ws",
                "target_var": "ws_model"
            }],
            "metrics": ["bias", "mae", "rmse"],
            "ramps": [
                {"definition": "r_magnitude", "magnitude": 2, "duration_minutes": 120},
                {"definition": "r_abs_magnitude", "magnitude": 15, "duration_minutes": 60}
            ],
            "output": {"path": "out", "org": "test", "writing": true}
        }"#,
    )
    .expect("config should decode")
}

fn summary_value(summary: &[(String, f64)], name: &str) -> f64 {
    summary
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| *v)
        .unwrap_or_else(|| panic!("missing statistic {name}"))
}

#[test]
fn hourly_run_scores_ramps_and_isolates_failing_level() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_hourly_inputs(dir.path());

    let report = run_evaluation(&hourly_config(), dir.path()).expect("run should complete");

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key.level, 40.0);
    assert_eq!(report.failures[0].code, "missing_data");

    let result = &report.results[0];
    assert_eq!(result.key.level, 100.0);
    assert_eq!(result.key.dataset, "model");
    assert_eq!(result.rows, 14);
    assert_eq!(result.rows_used, 14);

    let base_diag = &result.diagnostics[0];
    assert_eq!(base_diag.duplicates_removed.len(), 1);
    assert_eq!(result.pair.baseline()[3], 41.0);

    let bias = result
        .metrics
        .iter()
        .find(|m| m.metric == MetricKind::Bias)
        .expect("bias computed");
    let expected_bias = COMPARISON
        .iter()
        .zip(BASELINE.iter())
        .map(|(c, b)| c - b)
        .sum::<f64>()
        / 14.0;
    assert!((bias.value - expected_bias).abs() < 1e-12);

    let up = &result.ramps[0];
    assert_eq!(up.nature, RampNature::Up);
    assert_eq!(up.method, "r_magnitude_2ms-1_2h");
    assert_eq!(summary_value(&up.summary, "time_sample"), 12.0);
    assert_eq!(summary_value(&up.summary, "true_positive"), 2.0);
    assert_eq!(summary_value(&up.summary, "false_positive"), 2.0);
    assert_eq!(summary_value(&up.summary, "false_negative"), 2.0);
    assert_eq!(summary_value(&up.summary, "true_negative"), 6.0);
    assert_eq!(summary_value(&up.summary, "probability_of_detection"), 0.5);

    let abs = &result.ramps[1];
    assert_eq!(abs.nature, RampNature::All);
    assert_eq!(abs.flags.len(), 13);
    assert_eq!(abs.table.total(), 13);
}

#[test]
fn export_writes_long_format_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_hourly_inputs(dir.path());

    let (report, written) =
        run_and_export(&hourly_config(), dir.path(), None).expect("run should complete");
    assert_eq!(report.results.len(), 1);
    assert_eq!(written.len(), 4);

    let out = dir.path().join("out");
    let ts = fs::read_to_string(out.join("ts_test.csv")).expect("ts table");
    let mut lines = ts.lines();
    assert_eq!(
        lines.next(),
        Some("level,dataset,variable,time,baseline,comparison")
    );
    assert_eq!(lines.next(), Some("100,model,ws_model,2020-10-31 00:00:00,60,20"));
    assert_eq!(ts.lines().count(), 15);

    let metrics = fs::read_to_string(out.join("metrics_test.csv")).expect("metrics table");
    assert!(metrics.contains("100,model,ws_model,mae,"));

    let ramp = fs::read_to_string(out.join("ramp_test.csv")).expect("ramp table");
    assert!(ramp.starts_with("level,dataset,variable,ramp_nature,ramp_method,statistic,value"));
    assert!(ramp.contains("100,model,ws_model,up,r_magnitude_2ms-1_2h,true_positive,2"));

    let ramp_ts = fs::read_to_string(out.join("ramp_ts_test.csv")).expect("ramp ts table");
    assert!(ramp_ts
        .contains("100,model,ws_model,up,r_magnitude_2ms-1_2h,2020-10-31 06:00:00,20,20,1,1,true_positive"));
    // 12 rows for the 2h rule, 13 for the 1h rule, plus the header.
    assert_eq!(ramp_ts.lines().count(), 1 + 12 + 13);
}

#[test]
fn finer_baseline_is_averaged_onto_comparison_buckets() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut base = String::from("time,ws\n");
    for i in 1..=12 {
        let minutes = 10 * i;
        let value = if minutes <= 60 { 1.0 } else { 3.0 };
        writeln!(base, "2020-01-01 {:02}:{:02}:00,{value}", minutes / 60, minutes % 60)
            .expect("format row");
    }
    fs::write(dir.path().join("lidar.csv"), base).expect("write baseline");
    fs::write(
        dir.path().join("wrf.csv"),
        "time,ws\n2020-01-01 01:00:00,2\n2020-01-01 02:00:00,3\n",
    )
    .expect("write comparison");

    let config = EvaluationConfig::from_json_str(
        r#"{
            "window": {"start": "2020-01-01 00:00", "end": "2020-01-01 02:00"},
            "reference": {"var": "wind speed", "units": "ms-1", "select_method": "average"},
            "levels": {"heights": [80]},
            "base": {
                "name": "lidar",
                "source": {"kind": "csv", "path": "lidar.csv", "column": "ws"},
                "freq_minutes": 10,
                "target_var": "ws_lidar"
            },
            "comp": [{
                "name": "wrf",
                "source": {"kind": "csv", "path": "wrf.csv", "column": "ws"},
                "freq_minutes": 60,
                "target_var": "ws_wrf"
            }],
            "metrics": ["bias"]
        }"#,
    )
    .expect("config should decode");

    let (report, written) = run_and_export(&config, dir.path(), None).expect("run should complete");
    assert!(written.is_empty());
    assert!(report.is_clean());

    let result = &report.results[0];
    assert_eq!(result.pair.baseline(), &[1.0, 3.0]);
    assert_eq!(result.pair.comparison(), &[2.0, 3.0]);
    assert!((result.metrics[0].value - 0.5).abs() < 1e-12);
    assert!(result.ramps.is_empty());
}

#[test]
fn hub_height_wind_speed_is_scored_as_derived_power() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_hourly_inputs(dir.path());
    fs::write(dir.path().join("pc.csv"), "ws,kw\n10,100\n30,500\n50,900\n")
        .expect("write power curve");

    let mut config = hourly_config();
    config.power_curve = Some(PowerCurveSpec {
        hub_height: 100.0,
        path: "pc.csv".into(),
        ws: "ws".to_string(),
        power: "kw".to_string(),
    });

    let (report, _) = run_and_export(&config, dir.path(), None).expect("run should complete");
    let result = &report.results[0];
    assert_eq!(result.key.level, 100.0);
    assert_eq!(result.power_metrics.len(), 3);

    // Baseline power sums to 7400 kW and comparison power to 7800 kW.
    let bias = &result.power_metrics[0];
    assert_eq!(bias.metric, MetricKind::Bias);
    assert!((bias.value - 400.0 / 14.0).abs() < 1e-9);

    let metrics = fs::read_to_string(dir.path().join("out").join("metrics_test.csv"))
        .expect("metrics table");
    assert!(metrics.contains("100,model,power,bias,"));
    assert!(metrics.contains("100,model,ws_model,bias,"));
}

#[test]
fn ramp_tables_are_written_when_every_combination_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_hourly_inputs(dir.path());
    fs::remove_dir_all(dir.path().join("model")).expect("remove comparison");
    fs::create_dir(dir.path().join("model")).expect("recreate empty comparison dir");

    let (report, written) =
        run_and_export(&hourly_config(), dir.path(), None).expect("run should complete");
    assert!(report.results.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert_eq!(written.len(), 4);
    assert_eq!(
        report.ramp_methods,
        vec!["r_magnitude_2ms-1_2h".to_string(), "r_abs_magnitude_15ms-1_1h".to_string()]
    );
}
