#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic hotspot analysis for emergency call data.
//!
//! A batch of [`IncidentPoint`]s flows through density clustering
//! ([`HaversineDbscan`]), per-cluster annotation (severity ranking,
//! convex hulls, peak hours), and day/night temporal-shift comparison.
//! The combined [`ClusterAnalysis`] is memoized on the serving path by
//! a bounded FIFO [`ResultCache`].
//!
//! The whole pipeline is a synchronous batch computation: no I/O, and
//! deterministic for a fixed input, configuration, and point ordering.

pub mod annotate;
pub mod cache;
pub mod dbscan;
pub mod temporal;

use std::convert::Infallible;
use std::sync::Arc;

use crisislens_hotspots_models::{
    ClusterAnalysis, ClusterFilter, ClusterSummary, ClusteringConfig, OutlierPoint,
};
use crisislens_incident_models::IncidentPoint;

pub use crate::annotate::annotate;
pub use crate::cache::ResultCache;
pub use crate::dbscan::{HaversineDbscan, SpatialClusterer};
pub use crate::temporal::temporal_shifts;

/// Runs the full clustering pipeline on one batch of incidents.
///
/// Applies the filter's time-of-day window, clusters what remains,
/// annotates each cluster, and derives temporal shifts and the run
/// summary. An empty (or fully filtered-out) batch yields an empty
/// analysis rather than an error.
#[must_use]
pub fn analyze(
    points: &[IncidentPoint],
    config: &ClusteringConfig,
    filter: &ClusterFilter,
) -> ClusterAnalysis {
    let window = filter.time_window;
    let filtered: Vec<IncidentPoint> = points
        .iter()
        .filter(|p| window.contains_hour(p.hour()))
        .cloned()
        .collect();

    log::info!(
        "clustering {} of {} incidents (window: {window})",
        filtered.len(),
        points.len(),
    );

    let clusterer = HaversineDbscan::new(config.eps_km, config.min_samples);
    let labels = clusterer.cluster(&filtered);

    let clusters = annotate(&filtered, &labels, config);
    let temporal_analysis = temporal_shifts(&filtered, &labels, &clusters);

    let outliers: Vec<OutlierPoint> = filtered
        .iter()
        .zip(&labels)
        .filter(|&(_, &label)| label < 0)
        .map(|(p, _)| OutlierPoint {
            lat: p.lat,
            lon: p.lon,
            call_type: p.call_type.clone(),
            timestamp: p.timestamp,
        })
        .collect();

    let summary = ClusterSummary {
        total_clusters: clusters.len(),
        total_outliers: outliers.len(),
        highest_severity_cluster: clusters.first().map(|c| c.cluster_id),
    };

    log::info!(
        "found {} clusters, {} outliers",
        summary.total_clusters,
        summary.total_outliers
    );

    ClusterAnalysis {
        clusters,
        outliers,
        temporal_analysis,
        summary,
    }
}

/// Serving-path entry point: memoizes [`analyze`] under the filter's
/// cache key.
#[must_use]
pub fn analyze_cached(
    cache: &ResultCache<ClusterAnalysis>,
    points: &[IncidentPoint],
    config: &ClusteringConfig,
    filter: &ClusterFilter,
) -> Arc<ClusterAnalysis> {
    let result: Result<_, Infallible> =
        cache.get_or_compute(&filter.cache_key(), || Ok(analyze(points, config, filter)));
    match result {
        Ok(analysis) => analysis,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use crisislens_incident_models::TimeWindow;

    fn incident(lat: f64, lon: f64, call_type: &str, hour: u32) -> IncidentPoint {
        IncidentPoint::new(
            lat,
            lon,
            call_type,
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
        )
    }

    /// A tight 30-point blob plus 3 far-away stragglers.
    fn sample_batch() -> Vec<IncidentPoint> {
        let mut points = Vec::new();
        for i in 0..30 {
            let hour = if i % 3 == 0 { 21 } else { 10 };
            points.push(incident(
                40.0 + f64::from(i / 6) * 0.000_4,
                -75.0 + f64::from(i % 6) * 0.000_5,
                if i % 2 == 0 { "Fire" } else { "EMS" },
                hour,
            ));
        }
        points.push(incident(41.0, -74.0, "Vandalism", 2));
        points.push(incident(42.0, -73.0, "Vandalism", 3));
        points.push(incident(43.0, -72.0, "Vandalism", 4));
        points
    }

    #[test]
    fn member_and_outlier_counts_sum_to_input_size() {
        let points = sample_batch();
        let analysis = analyze(&points, &ClusteringConfig::default(), &ClusterFilter::default());

        let member_total: usize = analysis.clusters.iter().map(|c| c.call_count).sum();
        assert_eq!(member_total + analysis.outliers.len(), points.len());
        assert_eq!(analysis.summary.total_clusters, analysis.clusters.len());
        assert_eq!(analysis.summary.total_outliers, analysis.outliers.len());
    }

    #[test]
    fn summary_names_the_top_ranked_cluster() {
        let points = sample_batch();
        let analysis = analyze(&points, &ClusteringConfig::default(), &ClusterFilter::default());
        assert_eq!(
            analysis.summary.highest_severity_cluster,
            analysis.clusters.first().map(|c| c.cluster_id)
        );
    }

    #[test]
    fn empty_batch_yields_empty_analysis() {
        let analysis = analyze(&[], &ClusteringConfig::default(), &ClusterFilter::default());
        assert!(analysis.clusters.is_empty());
        assert!(analysis.outliers.is_empty());
        assert!(analysis.temporal_analysis.is_empty());
        assert_eq!(analysis.summary.highest_severity_cluster, None);
    }

    #[test]
    fn day_window_drops_night_calls_before_clustering() {
        let points = sample_batch();
        let filter = ClusterFilter {
            time_window: TimeWindow::Day,
            ..ClusterFilter::default()
        };

        let analysis = analyze(&points, &ClusteringConfig::default(), &filter);
        let member_total: usize = analysis.clusters.iter().map(|c| c.call_count).sum();
        let day_total = points.iter().filter(|p| p.is_daytime()).count();
        assert_eq!(member_total + analysis.outliers.len(), day_total);
    }

    #[test]
    fn pipeline_is_deterministic_run_to_run() {
        let points = sample_batch();
        let config = ClusteringConfig::default();
        let filter = ClusterFilter::default();
        assert_eq!(
            analyze(&points, &config, &filter),
            analyze(&points, &config, &filter)
        );
    }

    #[test]
    fn cached_analysis_matches_direct_computation() {
        let points = sample_batch();
        let config = ClusteringConfig::default();
        let filter = ClusterFilter::default();
        let cache = ResultCache::default();

        let direct = analyze(&points, &config, &filter);
        let cached = analyze_cached(&cache, &points, &config, &filter);
        let cached_again = analyze_cached(&cache, &points, &config, &filter);

        assert_eq!(*cached, direct);
        assert_eq!(*cached_again, direct);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn analysis_serializes_to_the_api_shape() {
        let points = sample_batch();
        let analysis = analyze(&points, &ClusteringConfig::default(), &ClusterFilter::default());

        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json["clusters"].is_array());
        assert!(json["outliers"].is_array());
        assert!(json["temporal_analysis"].is_array());
        assert!(json["summary"]["total_clusters"].is_number());
    }
}
