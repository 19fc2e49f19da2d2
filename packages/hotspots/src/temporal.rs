//! Day-vs-night call volume comparison per cluster.

use std::collections::BTreeMap;

use crisislens_hotspots_models::{Cluster, TemporalShift};
use crisislens_incident_models::IncidentPoint;

/// Computes one [`TemporalShift`] per cluster, in the clusters' rank order.
///
/// `shift_percentage` is `(night - day) / day * 100`, defined as exactly 0
/// when `day_calls` is 0 so a night-only cluster never produces an
/// infinite or undefined ratio.
#[must_use]
pub fn temporal_shifts(
    points: &[IncidentPoint],
    labels: &[i32],
    clusters: &[Cluster],
) -> Vec<TemporalShift> {
    let mut day_counts: BTreeMap<i32, usize> = BTreeMap::new();
    let mut night_counts: BTreeMap<i32, usize> = BTreeMap::new();

    for (point, &label) in points.iter().zip(labels) {
        if label < 0 {
            continue;
        }
        let counts = if point.is_daytime() {
            &mut day_counts
        } else {
            &mut night_counts
        };
        *counts.entry(label).or_default() += 1;
    }

    clusters
        .iter()
        .map(|cluster| {
            let day_calls = day_counts.get(&cluster.cluster_id).copied().unwrap_or(0);
            let night_calls = night_counts.get(&cluster.cluster_id).copied().unwrap_or(0);

            #[allow(clippy::cast_precision_loss)]
            let shift_percentage = if day_calls > 0 {
                let raw = (night_calls as f64 - day_calls as f64) / day_calls as f64 * 100.0;
                (raw * 10.0).round() / 10.0
            } else {
                0.0
            };

            TemporalShift {
                cluster_id: cluster.cluster_id,
                day_calls,
                night_calls,
                shift_percentage,
            }
        })
        .collect()
}
