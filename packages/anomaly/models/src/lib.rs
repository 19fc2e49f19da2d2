#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Types for day-level anomaly detection over emergency call volumes.
//!
//! A [`DailyFeatureVector`] summarizes one calendar day of calls; the
//! detector scores those vectors and emits [`AnomalyEvent`]s for flagged
//! days. Thresholds used for the human-readable reasons are dataset-tuned
//! constants, so they live in [`ReasonThresholds`] rather than in code.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Aggregated call features for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFeatureVector {
    /// Calendar day this vector summarizes.
    pub date: NaiveDate,
    /// Total calls on the day.
    pub total_calls: usize,
    /// Calls per tracked category; untracked categories are not counted.
    pub category_calls: BTreeMap<String, usize>,
    /// Percentage of calls per tracked category, rounded to 2 decimals.
    pub category_pct: BTreeMap<String, f64>,
    /// Call count of the busiest hour of the day.
    pub peak_hour_calls: usize,
    /// Calls outside the daytime window.
    pub night_calls: usize,
    /// Percentage of calls outside the daytime window, 2 decimals.
    pub night_pct: f64,
}

impl DailyFeatureVector {
    /// Percentage for a tracked category, 0 when absent.
    #[must_use]
    pub fn pct(&self, category: &str) -> f64 {
        self.category_pct.get(category).copied().unwrap_or(0.0)
    }
}

/// Severity of an anomalous day.
///
/// Assigned by a median split over the anomaly scores of the days flagged
/// in the same run: strictly below the median is `High`, the rest are
/// `Medium`. The boundary is relative to each run's flagged set, not an
/// absolute threshold.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum AnomalySeverity {
    /// Scored strictly below the flagged-set median.
    High,
    /// Scored at or above the flagged-set median.
    Medium,
}

/// One flagged day, as persisted and served to the read side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    /// Flagged calendar day; unique key in the store.
    pub date: NaiveDate,
    /// Total calls observed on the day.
    pub actual_calls: usize,
    /// Model score; lower means more anomalous.
    pub anomaly_score: f64,
    /// Relative severity within this run's flagged set.
    pub severity: AnomalySeverity,
    /// Concatenated rule explanations, or a generic fallback.
    pub reason: String,
    /// When the detection run produced this event.
    pub detected_at: DateTime<Utc>,
}

/// Percentage bounds for one tracked category's reason rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category the rule applies to.
    pub category: String,
    /// Flag "high" when the category share exceeds this percentage.
    pub high_pct: Option<f64>,
    /// Flag "low" when the category share falls below this percentage.
    pub low_pct: Option<f64>,
}

/// Dataset-tuned thresholds for anomaly reason text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonThresholds {
    /// Daily total above which the day reads as high volume.
    pub volume_high: usize,
    /// Daily total below which the day reads as low volume.
    pub volume_low: usize,
    /// Per-category percentage bounds.
    pub category_rules: Vec<CategoryRule>,
    /// Night-call percentage above which nighttime activity is unusual.
    pub night_pct_high: f64,
}

impl Default for ReasonThresholds {
    fn default() -> Self {
        Self {
            volume_high: 600,
            volume_low: 200,
            category_rules: vec![
                CategoryRule {
                    category: "Fire".to_string(),
                    high_pct: Some(25.0),
                    low_pct: None,
                },
                CategoryRule {
                    category: "Traffic".to_string(),
                    high_pct: Some(40.0),
                    low_pct: None,
                },
                CategoryRule {
                    category: "EMS".to_string(),
                    high_pct: None,
                    low_pct: Some(50.0),
                },
            ],
            night_pct_high: 15.0,
        }
    }
}

/// Configuration for a detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Expected fraction of days that are anomalous.
    pub contamination: f64,
    /// Seed for the outlier model, fixing the run's randomness.
    pub seed: u64,
    /// Minimum number of days required before fitting.
    pub min_days: usize,
    /// Categories whose shares feed the model, in feature order.
    pub categories: Vec<String>,
    /// Thresholds driving the reason text.
    pub thresholds: ReasonThresholds,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            contamination: 0.05,
            seed: 42,
            min_days: 7,
            categories: vec![
                "EMS".to_string(),
                "Fire".to_string(),
                "Traffic".to_string(),
            ],
            thresholds: ReasonThresholds::default(),
        }
    }
}
