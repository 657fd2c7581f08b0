// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use tracing::warn;
use wev_core::WevError;

/// Pure error statistic over baseline `x` and comparison `y`.
///
/// Inputs are expected to be free of NaN rows already.
pub trait MetricFunction {
    fn name(&self) -> &'static str;

    fn compute(&self, baseline: &[f64], comparison: &[f64]) -> Result<MetricValue, WevError>;
}

/// Metric result plus the number of rows masked as undefined.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricValue {
    pub value: f64,
    pub masked: usize,
}

impl MetricValue {
    fn exact(value: f64) -> Self {
        Self { value, masked: 0 }
    }
}

/// Built-in metrics, selected by name in configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// mean(y - x)
    Bias,
    /// mean(100 (y - x) / x)
    BiasPct,
    /// mean(|x - y|)
    Mae,
    /// mean(100 |x - y| / x)
    MaePct,
    /// median(|x - y|)
    Mdae,
    /// median(100 |x - y| / x)
    MdaePct,
    Rmse,
    /// RMSE of the de-meaned columns.
    Crmse,
    /// RMSE of each column divided by its own mean.
    Nrmse,
    /// Median symmetric accuracy, `100 (exp(median |ln(y / x)|) - 1)`.
    Msa,
}

impl MetricKind {
    pub const ALL: [MetricKind; 10] = [
        Self::Bias,
        Self::BiasPct,
        Self::Mae,
        Self::MaePct,
        Self::Mdae,
        Self::MdaePct,
        Self::Rmse,
        Self::Crmse,
        Self::Nrmse,
        Self::Msa,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bias => "bias",
            Self::BiasPct => "bias_pct",
            Self::Mae => "mae",
            Self::MaePct => "mae_pct",
            Self::Mdae => "mdae",
            Self::MdaePct => "mdae_pct",
            Self::Rmse => "rmse",
            Self::Crmse => "crmse",
            Self::Nrmse => "nrmse",
            Self::Msa => "msa",
        }
    }

    /// Whether the result is a percentage rather than in the variable's units.
    pub fn is_percent(self) -> bool {
        matches!(
            self,
            Self::BiasPct | Self::MaePct | Self::MdaePct | Self::Nrmse | Self::Msa
        )
    }
}

impl MetricFunction for MetricKind {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn compute(&self, x: &[f64], y: &[f64]) -> Result<MetricValue, WevError> {
        if x.len() != y.len() {
            return Err(WevError::length_mismatch(format!(
                "metric '{}' needs equal-length inputs: baseline={}, comparison={}",
                self.as_str(),
                x.len(),
                y.len()
            )));
        }

        let value = match self {
            Self::Bias => MetricValue::exact(mean(x.iter().zip(y).map(|(a, b)| b - a))),
            Self::Mae => MetricValue::exact(mean(x.iter().zip(y).map(|(a, b)| (a - b).abs()))),
            Self::Mdae => MetricValue::exact(median(
                x.iter().zip(y).map(|(a, b)| (a - b).abs()).collect(),
            )),
            Self::Rmse => MetricValue::exact(root_mean_square(
                x.iter().zip(y).map(|(a, b)| a - b),
            )),
            Self::Crmse => {
                let mx = mean(x.iter().copied());
                let my = mean(y.iter().copied());
                MetricValue::exact(root_mean_square(
                    x.iter().zip(y).map(|(a, b)| (a - mx) - (b - my)),
                ))
            }
            Self::Nrmse => {
                let mx = mean(x.iter().copied());
                let my = mean(y.iter().copied());
                MetricValue::exact(root_mean_square(
                    x.iter().zip(y).map(|(a, b)| a / mx - b / my),
                ))
            }
            Self::BiasPct => {
                let (ratios, masked) = masked_ratios(self.as_str(), x, y, |a, b| (b - a) / a);
                MetricValue {
                    value: mean(ratios.into_iter().map(|r| 100.0 * r)),
                    masked,
                }
            }
            Self::MaePct => {
                let (ratios, masked) =
                    masked_ratios(self.as_str(), x, y, |a, b| (a - b).abs() / a);
                MetricValue {
                    value: mean(ratios.into_iter().map(|r| 100.0 * r)),
                    masked,
                }
            }
            Self::MdaePct => {
                let (ratios, masked) =
                    masked_ratios(self.as_str(), x, y, |a, b| (a - b).abs() / a);
                MetricValue {
                    value: median(ratios.into_iter().map(|r| 100.0 * r).collect()),
                    masked,
                }
            }
            Self::Msa => {
                let (logs, masked) =
                    masked_ratios(self.as_str(), x, y, |a, b| (b / a).ln().abs());
                MetricValue {
                    value: (median(logs).exp() - 1.0) * 100.0,
                    masked,
                }
            }
        };

        Ok(value)
    }
}

/// Applies `f` row-wise and drops non-finite results, warning with the count.
fn masked_ratios(
    metric: &str,
    x: &[f64],
    y: &[f64],
    f: impl Fn(f64, f64) -> f64,
) -> (Vec<f64>, usize) {
    let mut kept = Vec::with_capacity(x.len());
    for (a, b) in x.iter().zip(y) {
        let r = f(*a, *b);
        if r.is_finite() {
            kept.push(r);
        }
    }
    let masked = x.len() - kept.len();
    if masked > 0 {
        warn!(
            metric,
            masked, "ignoring rows with undefined ratios (e.g. division by zero)"
        );
    }
    (kept, masked)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn root_mean_square(values: impl Iterator<Item = f64>) -> f64 {
    mean(values.map(|v| v * v)).sqrt()
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
