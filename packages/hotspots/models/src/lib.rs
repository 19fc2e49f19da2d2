#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration and result types for the hotspot clustering pipeline.
//!
//! The output types serialize to the JSON shapes served by the `/clusters`
//! endpoint: a severity-ranked cluster list, a noise-point list, per-cluster
//! day/night shifts, and a run summary.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use crisislens_incident_models::TimeWindow;
use serde::{Deserialize, Serialize};

/// Label assigned to points that no cluster reaches.
pub const OUTLIER_LABEL: i32 = -1;

/// Parameters for a clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Neighborhood radius in kilometers.
    pub eps_km: f64,
    /// Minimum neighbors (including the point itself) for a core point.
    pub min_samples: usize,
    /// Category -> severity weight in `[0, 1]`. Categories missing from
    /// the table fall back to [`Self::default_weight`].
    pub severity_weights: BTreeMap<String, f64>,
    /// Weight applied to categories absent from `severity_weights`.
    pub default_weight: f64,
}

impl ClusteringConfig {
    /// Severity weight for a category, falling back to the default.
    #[must_use]
    pub fn weight(&self, call_type: &str) -> f64 {
        self.severity_weights
            .get(call_type)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        let severity_weights = BTreeMap::from([
            ("Fire".to_string(), 0.9),
            ("Medical Emergency".to_string(), 0.85),
            ("Assault".to_string(), 0.75),
            ("Accident".to_string(), 0.7),
            ("Robbery".to_string(), 0.65),
            ("Burglary".to_string(), 0.5),
            ("Vandalism".to_string(), 0.3),
            ("Noise Complaint".to_string(), 0.1),
        ]);

        Self {
            eps_km: 1.1,
            min_samples: 10,
            severity_weights,
            default_weight: 0.5,
        }
    }
}

/// Dashboard filter parameters for a clustering request.
///
/// Only `time_window` is applied inside the core (the upstream loader has
/// already applied category, date, and district filters when it
/// materialized the batch); the remaining fields exist so the cache key
/// covers every parameter that shaped the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterFilter {
    /// Time-of-day window applied before clustering.
    pub time_window: TimeWindow,
    /// Minimum severity score applied post-hoc by the read side.
    pub min_severity: Option<f64>,
    /// Category labels the loader filtered on.
    pub categories: Vec<String>,
    /// Inclusive start of the loaded date range.
    pub start_date: Option<NaiveDateTime>,
    /// Inclusive end of the loaded date range.
    pub end_date: Option<NaiveDateTime>,
    /// District the loader filtered on.
    pub district: Option<String>,
}

impl ClusterFilter {
    /// Derives the cache key covering every filter parameter.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let fmt_date = |d: Option<NaiveDateTime>| {
            d.map_or_else(String::new, |d| d.format("%Y-%m-%dT%H:%M:%S").to_string())
        };

        format!(
            "{}_{}_{}_{}_{}_{}",
            self.time_window,
            self.min_severity.map_or_else(String::new, |s| s.to_string()),
            self.categories.join(","),
            fmt_date(self.start_date),
            fmt_date(self.end_date),
            self.district.as_deref().unwrap_or_default(),
        )
    }
}

/// Geographic center of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterCenter {
    /// Mean member latitude.
    pub lat: f64,
    /// Mean member longitude.
    pub lon: f64,
}

/// One density cluster with its derived statistics.
///
/// Created once per clustering run and never mutated afterwards; the
/// `polygon` is a closed `[lat, lon]` ring ready for map rendering, or
/// `None` when the cluster has fewer than three distinct coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster id assigned by the clusterer (>= 0).
    pub cluster_id: i32,
    /// Number of member incidents.
    pub call_count: usize,
    /// Most frequent category among members.
    pub primary_type: String,
    /// Share of members with the primary category, in percent.
    pub primary_type_pct: f64,
    /// Most frequent hour-of-day (0-23) among members.
    pub peak_hour: u32,
    /// Composite severity score in `[0, 10]`.
    pub severity_score: f64,
    /// Convex hull of member coordinates as a closed `[lat, lon]` ring.
    pub polygon: Option<Vec<[f64; 2]>>,
    /// Mean member coordinate.
    pub center: ClusterCenter,
}

/// A noise point: an incident no cluster reaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Category label of the incident.
    pub call_type: String,
    /// Timestamp of the incident.
    pub timestamp: NaiveDateTime,
}

/// Day-vs-night call volume comparison for one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalShift {
    /// Cluster this shift describes.
    pub cluster_id: i32,
    /// Member calls with hour in `[6, 18)`.
    pub day_calls: usize,
    /// Member calls outside the daytime window.
    pub night_calls: usize,
    /// `(night - day) / day * 100`; exactly 0 when `day_calls` is 0.
    pub shift_percentage: f64,
}

/// Headline numbers for a clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Number of clusters found.
    pub total_clusters: usize,
    /// Number of noise points.
    pub total_outliers: usize,
    /// Id of the highest-severity cluster, if any cluster exists.
    pub highest_severity_cluster: Option<i32>,
}

/// Complete output of one clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    /// Clusters sorted descending by severity score.
    pub clusters: Vec<Cluster>,
    /// Incidents labeled as noise.
    pub outliers: Vec<OutlierPoint>,
    /// Per-cluster day/night comparison.
    pub temporal_analysis: Vec<TemporalShift>,
    /// Headline numbers.
    pub summary: ClusterSummary,
}

impl ClusterAnalysis {
    /// Clusters at or above a minimum severity, preserving rank order.
    ///
    /// This is the post-hoc filter the read side applies when a request
    /// carries `min_severity`.
    #[must_use]
    pub fn clusters_at_least(&self, min_severity: f64) -> Vec<&Cluster> {
        self.clusters
            .iter()
            .filter(|c| c.severity_score >= min_severity)
            .collect()
    }
}
