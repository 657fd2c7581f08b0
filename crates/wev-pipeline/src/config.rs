// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use wev_core::{parse_timestamp, EvaluationWindow, Frequency, Timestamp, WevError};
use wev_eval::MetricKind;
use wev_qc::{
    AlignConfig, AlignMode, SelectionPolicy, VerifyConfig, DEFAULT_MAX_GRID_FACTOR,
    DEFAULT_MAX_ITERATIONS,
};
use wev_ramps::RampDefinition;

fn de_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    #[serde(deserialize_with = "de_timestamp")]
    pub start: Timestamp,
    #[serde(deserialize_with = "de_timestamp")]
    pub end: Timestamp,
}

/// Bucket labelling used when resampling; `null` in configuration means the
/// series are merged as-is without resampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectData {
    End,
}

fn default_select_data() -> Option<SelectData> {
    Some(SelectData::End)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    pub var: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub select_method: SelectionPolicy,
    #[serde(default = "default_select_data")]
    pub select_data: Option<SelectData>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub heights: Vec<f64>,
    #[serde(default)]
    pub units: String,
}

/// Where a dataset's series come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// Delimited text file, or a directory holding exactly one `.csv` file.
    ///
    /// `column` may contain `{level}`, replaced by the height being evaluated.
    Csv {
        path: PathBuf,
        column: String,
        #[serde(default)]
        time_column: Option<String>,
        /// Value the instrument writes for invalid samples, e.g. `-999`.
        #[serde(default)]
        flag: Option<f64>,
    },
}

impl SourceSpec {
    pub fn flag(&self) -> Option<f64> {
        match self {
            Self::Csv { flag, .. } => *flag,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub source: SourceSpec,
    pub freq_minutes: u32,
    #[serde(default)]
    pub nature: String,
    pub target_var: String,
}

impl DatasetSpec {
    pub fn frequency(&self) -> Result<Frequency, WevError> {
        Frequency::from_minutes(self.freq_minutes).map_err(|_| {
            WevError::invalid_input(format!(
                "dataset '{}' must declare freq_minutes > 0",
                self.name
            ))
        })
    }

    pub fn is_wind_direction(&self) -> bool {
        self.nature == "wd"
    }

    pub fn is_wind_speed(&self) -> bool {
        self.nature == "ws"
    }
}

fn default_writing() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub path: PathBuf,
    pub org: String,
    #[serde(default = "default_writing")]
    pub writing: bool,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_max_grid_factor() -> usize {
    DEFAULT_MAX_GRID_FACTOR
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifySpec {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_max_grid_factor")]
    pub max_grid_factor: usize,
}

impl Default for VerifySpec {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_grid_factor: DEFAULT_MAX_GRID_FACTOR,
        }
    }
}

/// Turbine power curve applied to hub-height wind speeds.
///
/// `path` is a delimited file with the `ws` and `power` columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerCurveSpec {
    pub hub_height: f64,
    pub path: PathBuf,
    pub ws: String,
    pub power: String,
}

/// One evaluation run: a baseline against one or more comparison datasets
/// at each configured height.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub location: String,
    pub window: WindowSpec,
    pub reference: ReferenceSpec,
    pub levels: LevelSpec,
    pub base: DatasetSpec,
    pub comp: Vec<DatasetSpec>,
    #[serde(default)]
    pub metrics: Vec<MetricKind>,
    #[serde(default)]
    pub ramps: Vec<RampDefinition>,
    #[serde(default)]
    pub output: Option<OutputSpec>,
    #[serde(default)]
    pub verify: VerifySpec,
    #[serde(default)]
    pub power_curve: Option<PowerCurveSpec>,
}

impl EvaluationConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, WevError> {
        serde_json::from_str(raw)
            .map_err(|err| WevError::invalid_input(format!("failed to parse configuration: {err}")))
    }

    pub fn from_path(path: &Path) -> Result<Self, WevError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| WevError::io(format!("failed to read '{}': {err}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), WevError> {
        if self.levels.heights.is_empty() {
            return Err(WevError::invalid_input("levels.heights must not be empty"));
        }
        if let Some(bad) = self.levels.heights.iter().find(|h| !h.is_finite()) {
            return Err(WevError::invalid_input(format!(
                "levels.heights must be finite; got {bad}"
            )));
        }
        self.evaluation_window()?;
        self.base.frequency()?;
        if self.comp.is_empty() {
            return Err(WevError::invalid_input(
                "at least one comparison dataset is required",
            ));
        }
        for dataset in &self.comp {
            dataset.frequency()?;
        }
        for definition in &self.ramps {
            definition.validate()?;
        }
        if self.verify.max_iterations == 0 {
            return Err(WevError::invalid_input("verify.max_iterations must be >= 1"));
        }
        if self.verify.max_grid_factor == 0 {
            return Err(WevError::invalid_input("verify.max_grid_factor must be >= 1"));
        }
        for dataset in std::iter::once(&self.base).chain(&self.comp) {
            if let Some(flag) = dataset.source.flag() {
                if !flag.is_finite() {
                    return Err(WevError::invalid_input(format!(
                        "dataset '{}' flag must be finite",
                        dataset.name
                    )));
                }
            }
        }
        if let Some(curve) = &self.power_curve {
            if !curve.hub_height.is_finite() {
                return Err(WevError::invalid_input("power_curve.hub_height must be finite"));
            }
        }
        Ok(())
    }

    pub fn evaluation_window(&self) -> Result<EvaluationWindow, WevError> {
        EvaluationWindow::new(self.window.start, self.window.end)
    }

    pub fn align_config(&self) -> Result<AlignConfig, WevError> {
        let mode = match self.reference.select_data {
            Some(SelectData::End) => AlignMode::BucketEnd,
            None => AlignMode::PlainMerge,
        };
        Ok(AlignConfig::new(self.evaluation_window()?)
            .with_policy(self.reference.select_method)
            .with_mode(mode))
    }

    pub fn verify_config(&self, dataset: &DatasetSpec) -> Result<VerifyConfig, WevError> {
        let config = VerifyConfig::new(dataset.frequency()?)
            .with_max_iterations(self.verify.max_iterations)
            .with_max_grid_factor(self.verify.max_grid_factor);
        Ok(match dataset.source.flag() {
            Some(flag) => config.with_flag(flag),
            None => config,
        })
    }

    /// Whether power is derived for `dataset`: both sides are wind speeds and
    /// the curve's hub height is one of the evaluated levels.
    pub fn derives_power_for(&self, dataset: &DatasetSpec) -> bool {
        match &self.power_curve {
            Some(curve) => {
                self.base.is_wind_speed()
                    && dataset.is_wind_speed()
                    && self.levels.heights.contains(&curve.hub_height)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EvaluationConfig, SelectData, SourceSpec};
    use wev_eval::MetricKind;
    use wev_qc::{AlignMode, SelectionPolicy, DEFAULT_MAX_GRID_FACTOR, DEFAULT_MAX_ITERATIONS};
    use wev_ramps::RampDefinition;

    const MINIMAL: &str = r#"{
        "location": "Baltic 2",
        "window": {"start": "2019-07-04 00:00", "end": "2019-07-05T00:00:00Z"},
        "reference": {"var": "wind speed", "units": "ms-1"},
        "levels": {"heights": [100, 40.5], "units": "m"},
        "base": {
            "name": "lidar",
            "source": {"kind": "csv", "path": "lidar.csv", "column": "ws_{level}m"},
            "freq_minutes": 10,
            "nature": "ws",
            "target_var": "ws_lidar"
        },
        "comp": [{
            "name": "wrf",
            "source": {"kind": "csv", "path": "wrf", "column": "speed_{level}", "time_column": "t"},
            "freq_minutes": 60,
            "nature": "ws",
            "target_var": "ws_wrf"
        }],
        "metrics": ["bias", "rmse", "mae_pct"],
        "ramps": [{"definition": "r_magnitude", "magnitude": 2.0, "duration_minutes": 120}]
    }"#;

    #[test]
    fn decodes_with_defaults() {
        let config = EvaluationConfig::from_json_str(MINIMAL).expect("config should decode");
        config.validate().expect("config should validate");

        assert_eq!(config.reference.select_method, SelectionPolicy::Instance);
        assert_eq!(config.reference.select_data, Some(SelectData::End));
        assert_eq!(config.verify.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.verify.max_grid_factor, DEFAULT_MAX_GRID_FACTOR);
        assert!(config.power_curve.is_none());
        assert_eq!(config.base.source.flag(), None);
        assert!(!config.derives_power_for(&config.comp[0]));
        assert_eq!(config.metrics, vec![MetricKind::Bias, MetricKind::Rmse, MetricKind::MaePct]);
        assert!(matches!(config.ramps[0], RampDefinition::SignedMagnitude { .. }));
        assert!(matches!(
            &config.comp[0].source,
            SourceSpec::Csv { time_column: Some(t), .. } if t == "t"
        ));
        assert!(config.output.is_none());
        assert_eq!(
            config.align_config().expect("align config").mode,
            AlignMode::BucketEnd
        );
    }

    #[test]
    fn null_select_data_means_plain_merge() {
        let raw = MINIMAL.replace(
            r#""units": "ms-1"}"#,
            r#""units": "ms-1", "select_data": null, "select_method": "average"}"#,
        );
        let config = EvaluationConfig::from_json_str(&raw).expect("config should decode");
        let align = config.align_config().expect("align config");
        assert_eq!(align.mode, AlignMode::PlainMerge);
        assert_eq!(align.policy, SelectionPolicy::Average);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let empty_levels = MINIMAL.replace("[100, 40.5]", "[]");
        let config = EvaluationConfig::from_json_str(&empty_levels).expect("decodes");
        assert_eq!(config.validate().expect_err("must fail").code(), "invalid_input");

        let inverted = MINIMAL.replace("2019-07-05T00:00:00Z", "2019-07-03 00:00");
        let config = EvaluationConfig::from_json_str(&inverted).expect("decodes");
        assert!(config.validate().is_err());

        let zero_freq = MINIMAL.replace(r#""freq_minutes": 60"#, r#""freq_minutes": 0"#);
        let config = EvaluationConfig::from_json_str(&zero_freq).expect("decodes");
        assert!(config.validate().is_err());

        let zero_ramp = MINIMAL.replace(r#""magnitude": 2.0"#, r#""magnitude": 0.0"#);
        let config = EvaluationConfig::from_json_str(&zero_ramp).expect("decodes");
        assert!(config.validate().is_err());

        let zero_lag = MINIMAL.replace(r#""duration_minutes": 120"#, r#""duration_minutes": 0"#);
        let config = EvaluationConfig::from_json_str(&zero_lag).expect("decodes");
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_kinds_fail_at_decode_time() {
        let bad_metric = MINIMAL.replace(r#""mae_pct""#, r#""wobble""#);
        assert!(EvaluationConfig::from_json_str(&bad_metric).is_err());

        let bad_source = MINIMAL.replace(r#""kind": "csv", "path": "lidar.csv""#, r#""kind": "netcdf", "path": "x""#);
        assert!(EvaluationConfig::from_json_str(&bad_source).is_err());

        let bad_time = MINIMAL.replace("2019-07-04 00:00", "yesterday");
        assert!(EvaluationConfig::from_json_str(&bad_time).is_err());
    }

    #[test]
    fn flag_reaches_the_verifier_config() {
        let raw = MINIMAL.replace(
            r#""column": "ws_{level}m"}"#,
            r#""column": "ws_{level}m", "flag": -999}"#,
        );
        let config = EvaluationConfig::from_json_str(&raw).expect("config should decode");
        config.validate().expect("config should validate");

        assert_eq!(config.base.source.flag(), Some(-999.0));
        let verify = config.verify_config(&config.base).expect("verify config");
        assert_eq!(verify.flag, Some(-999.0));
        assert_eq!(verify.max_grid_factor, DEFAULT_MAX_GRID_FACTOR);
        assert_eq!(config.verify_config(&config.comp[0]).expect("verify config").flag, None);
    }

    #[test]
    fn power_curve_applies_only_to_wind_speed_at_a_hub_level() {
        let with_curve = MINIMAL.replace(
            r#""metrics": ["#,
            r#""power_curve": {"hub_height": 100, "path": "pc.csv", "ws": "ws", "power": "kw"},
            "metrics": ["#,
        );
        let config = EvaluationConfig::from_json_str(&with_curve).expect("config should decode");
        config.validate().expect("config should validate");
        assert!(config.derives_power_for(&config.comp[0]));

        let off_level = with_curve.replace(r#""hub_height": 100"#, r#""hub_height": 80"#);
        let config = EvaluationConfig::from_json_str(&off_level).expect("config should decode");
        assert!(!config.derives_power_for(&config.comp[0]));

        let direction = with_curve.replace(
            r#""nature": "ws",
            "target_var": "ws_wrf""#,
            r#""nature": "wd",
            "target_var": "ws_wrf""#,
        );
        let config = EvaluationConfig::from_json_str(&direction).expect("config should decode");
        assert!(!config.derives_power_for(&config.comp[0]));
    }
}
