// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::time_series::Timestamp;
use std::borrow::Cow;

/// Diagnostics schema version for run reports.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured record of what one pipeline stage observed and repaired.
///
/// Warnings are data-quality findings: the stage repaired or masked the data
/// and carried on. Each combination owns its own `Diagnostics`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub stage: Cow<'static, str>,
    pub subject: String,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub duplicates_removed: Vec<Timestamp>,
    pub gaps_filled: Vec<Timestamp>,
    pub rows_dropped: Vec<Timestamp>,
    /// Samples whose value equalled the source's flag value and became `NaN`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub values_masked: Vec<Timestamp>,
    pub iterations: Option<usize>,
    pub desired_len: Option<f64>,
    pub final_len: Option<usize>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            stage: Cow::Borrowed(""),
            subject: String::new(),
            notes: vec![],
            warnings: vec![],
            duplicates_removed: vec![],
            gaps_filled: vec![],
            rows_dropped: vec![],
            values_masked: vec![],
            iterations: None,
            desired_len: None,
            final_len: None,
        }
    }
}

impl Diagnostics {
    pub fn for_stage(stage: &'static str, subject: impl Into<String>) -> Self {
        Self {
            stage: Cow::Borrowed(stage),
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostics, DIAGNOSTICS_SCHEMA_VERSION};
    use std::borrow::Cow;

    #[test]
    fn diagnostics_default_sets_schema_and_engine_version() {
        let diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert_eq!(diagnostics.stage, Cow::Borrowed(""));
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.duplicates_removed.is_empty());
        assert!(diagnostics.iterations.is_none());
    }

    #[test]
    fn for_stage_records_subject_and_messages() {
        let mut diagnostics = Diagnostics::for_stage("verify", "lidar ws 100m");
        diagnostics.note("first pass");
        assert!(!diagnostics.has_warnings());
        diagnostics.warn("2 duplicated rows");

        assert_eq!(diagnostics.stage, Cow::Borrowed("verify"));
        assert_eq!(diagnostics.subject, "lidar ws 100m");
        assert_eq!(diagnostics.notes, vec!["first pass".to_string()]);
        assert!(diagnostics.has_warnings());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn diagnostics_serde_roundtrip_preserves_fields() {
        use chrono::{TimeZone, Utc};

        let ts = Utc
            .with_ymd_and_hms(2020, 1, 1, 0, 10, 0)
            .single()
            .expect("valid test timestamp");
        let diagnostics = Diagnostics {
            stage: Cow::Owned("verify".to_string()),
            subject: "ws".to_string(),
            warnings: vec!["gap filled".to_string()],
            gaps_filled: vec![ts],
            iterations: Some(2),
            desired_len: Some(7.0),
            final_len: Some(7),
            ..Diagnostics::default()
        };

        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: Diagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }
}
