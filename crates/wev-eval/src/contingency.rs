// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;
use wev_core::WevError;

/// Agreement class of one row of paired event flags.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContingencyCategory {
    TruePositive,
    FalsePositive,
    FalseNegative,
    TrueNegative,
}

impl ContingencyCategory {
    /// `baseline` is the reference ("observed") flag, `comparison` the
    /// forecast flag.
    pub fn of(baseline: bool, comparison: bool) -> Self {
        match (baseline, comparison) {
            (true, true) => Self::TruePositive,
            (false, true) => Self::FalsePositive,
            (true, false) => Self::FalseNegative,
            (false, false) => Self::TrueNegative,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TruePositive => "true_positive",
            Self::FalsePositive => "false_positive",
            Self::FalseNegative => "false_negative",
            Self::TrueNegative => "true_negative",
        }
    }
}

/// Categorical skill scores; `NaN` wherever a denominator is zero.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkillScores {
    pub probability_of_detection: f64,
    pub critical_success_index: f64,
    pub frequency_bias_score: f64,
    pub false_alarm_rate: f64,
    pub forecast_accuracy: f64,
    pub peirces_skill_score: f64,
    pub symmetric_extreme_dependency_score: f64,
}

/// 2x2 contingency counts between baseline and comparison event flags,
/// plus the per-row category for traceability.
///
/// Each row carries exactly one [`ContingencyCategory`]; [`Self::validate`]
/// checks that the counts agree with those rows.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ContingencyTableRepr"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContingencyTable {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
    pub baseline_events: usize,
    pub comparison_events: usize,
    pub categories: Vec<ContingencyCategory>,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ContingencyTable {
    /// Builds the table from two flag columns over the same timestamps.
    pub fn from_flags(baseline: &[bool], comparison: &[bool]) -> Result<Self, WevError> {
        if baseline.len() != comparison.len() {
            return Err(WevError::length_mismatch(format!(
                "contingency flags must have equal length: baseline={}, comparison={}",
                baseline.len(),
                comparison.len()
            )));
        }

        let mut table = Self {
            true_positive: 0,
            false_positive: 0,
            false_negative: 0,
            true_negative: 0,
            baseline_events: 0,
            comparison_events: 0,
            categories: Vec::with_capacity(baseline.len()),
        };

        for (&b, &c) in baseline.iter().zip(comparison) {
            let category = ContingencyCategory::of(b, c);
            match category {
                ContingencyCategory::TruePositive => table.true_positive += 1,
                ContingencyCategory::FalsePositive => table.false_positive += 1,
                ContingencyCategory::FalseNegative => table.false_negative += 1,
                ContingencyCategory::TrueNegative => table.true_negative += 1,
            }
            table.baseline_events += usize::from(b);
            table.comparison_events += usize::from(c);
            table.categories.push(category);
        }

        Ok(table)
    }

    /// Checks that every count matches the per-row categories and that the
    /// event totals follow from them.
    pub fn validate(&self) -> Result<(), WevError> {
        let tally = |wanted: ContingencyCategory| {
            self.categories.iter().filter(|c| **c == wanted).count()
        };
        for (category, count) in [
            (ContingencyCategory::TruePositive, self.true_positive),
            (ContingencyCategory::FalsePositive, self.false_positive),
            (ContingencyCategory::FalseNegative, self.false_negative),
            (ContingencyCategory::TrueNegative, self.true_negative),
        ] {
            let rows = tally(category);
            if rows != count {
                return Err(WevError::invalid_input(format!(
                    "{} count is {count} but {rows} rows carry that category",
                    category.as_str()
                )));
            }
        }
        if self.baseline_events != self.true_positive + self.false_negative
            || self.comparison_events != self.true_positive + self.false_positive
        {
            return Err(WevError::invalid_input(format!(
                "event totals (baseline={}, comparison={}) disagree with the 2x2 counts",
                self.baseline_events, self.comparison_events
            )));
        }
        Ok(())
    }

    pub fn total(&self) -> usize {
        self.categories.len()
    }

    /// TP / (TP + FN)
    pub fn probability_of_detection(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// TP / (TP + FP + FN)
    pub fn critical_success_index(&self) -> f64 {
        ratio(
            self.true_positive,
            self.true_positive + self.false_positive + self.false_negative,
        )
    }

    /// (TP + FP) / (TP + FN)
    pub fn frequency_bias_score(&self) -> f64 {
        ratio(
            self.true_positive + self.false_positive,
            self.true_positive + self.false_negative,
        )
    }

    /// FP / (TN + FP)
    pub fn false_alarm_rate(&self) -> f64 {
        ratio(self.false_positive, self.true_negative + self.false_positive)
    }

    /// TP / (TP + FP)
    pub fn forecast_accuracy(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// POD - FARATE
    pub fn peirces_skill_score(&self) -> f64 {
        self.probability_of_detection() - self.false_alarm_rate()
    }

    /// `[ln((TP+FP)/N) + ln((TP+FN)/N)] / ln(TP/N) - 1`.
    ///
    /// Undefined when there are no hits or every row is a hit.
    pub fn symmetric_extreme_dependency_score(&self) -> f64 {
        let n = self.total();
        if self.true_positive == 0 || self.true_positive == n {
            return f64::NAN;
        }
        let n = n as f64;
        let forecast = (self.true_positive + self.false_positive) as f64 / n;
        let observed = (self.true_positive + self.false_negative) as f64 / n;
        let hits = self.true_positive as f64 / n;
        (forecast.ln() + observed.ln()) / hits.ln() - 1.0
    }

    pub fn scores(&self) -> SkillScores {
        SkillScores {
            probability_of_detection: self.probability_of_detection(),
            critical_success_index: self.critical_success_index(),
            frequency_bias_score: self.frequency_bias_score(),
            false_alarm_rate: self.false_alarm_rate(),
            forecast_accuracy: self.forecast_accuracy(),
            peirces_skill_score: self.peirces_skill_score(),
            symmetric_extreme_dependency_score: self.symmetric_extreme_dependency_score(),
        }
    }

    /// Named statistics in export order.
    pub fn summary(&self) -> Vec<(&'static str, f64)> {
        let scores = self.scores();
        vec![
            ("time_sample", self.total() as f64),
            ("base_ramp", self.baseline_events as f64),
            ("comp_ramp", self.comparison_events as f64),
            ("true_positive", self.true_positive as f64),
            ("false_positive", self.false_positive as f64),
            ("false_negative", self.false_negative as f64),
            ("true_negative", self.true_negative as f64),
            ("probability_of_detection", scores.probability_of_detection),
            ("critical_success_index", scores.critical_success_index),
            ("frequency_bias_score", scores.frequency_bias_score),
            ("false_alarm_rate", scores.false_alarm_rate),
            ("forecast_accuracy", scores.forecast_accuracy),
            ("peirces_skill_score", scores.peirces_skill_score),
            (
                "symmetric_extreme_dependency_score",
                scores.symmetric_extreme_dependency_score,
            ),
        ]
    }
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tp = self.true_positive;
        let fp = self.false_positive;
        let fn_ = self.false_negative;
        let tn = self.true_negative;
        writeln!(
            f,
            "{:<22}| {:<22}| {:<22}| {:>6}",
            "", "baseline: ramps", "baseline: no ramps", "total"
        )?;
        writeln!(
            f,
            "{:<22}| {:<22}| {:<22}| {:>6}",
            "comparison: ramps",
            format!("true positive: {tp}"),
            format!("false positive: {fp}"),
            tp + fp
        )?;
        writeln!(
            f,
            "{:<22}| {:<22}| {:<22}| {:>6}",
            "comparison: no ramps",
            format!("false negative: {fn_}"),
            format!("true negative: {tn}"),
            fn_ + tn
        )?;
        write!(
            f,
            "{:<22}| {:<22}| {:<22}| {:>6}",
            "total",
            tp + fn_,
            fp + tn,
            self.total()
        )
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ContingencyTableRepr {
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
    true_negative: usize,
    baseline_events: usize,
    comparison_events: usize,
    categories: Vec<ContingencyCategory>,
}

#[cfg(feature = "serde")]
impl TryFrom<ContingencyTableRepr> for ContingencyTable {
    type Error = WevError;

    fn try_from(repr: ContingencyTableRepr) -> Result<Self, Self::Error> {
        let table = Self {
            true_positive: repr.true_positive,
            false_positive: repr.false_positive,
            false_negative: repr.false_negative,
            true_negative: repr.true_negative,
            baseline_events: repr.baseline_events,
            comparison_events: repr.comparison_events,
            categories: repr.categories,
        };
        table.validate()?;
        Ok(table)
    }
}
