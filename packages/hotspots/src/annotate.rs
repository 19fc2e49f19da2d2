//! Per-cluster statistics: primary category, peak hour, severity, hull.

use std::collections::BTreeMap;

use crisislens_hotspots_models::{Cluster, ClusterCenter, ClusteringConfig};
use crisislens_incident_models::IncidentPoint;
use geo::{ConvexHull as _, MultiPoint, Point};

/// Member count at which the size factor saturates.
const SIZE_FACTOR_SCALE: f64 = 50.0;
/// Upper bound on the size factor.
const SIZE_FACTOR_MAX: f64 = 2.0;

/// Frequency counter that remembers first-encounter order, so ties break
/// toward the value seen earliest.
struct OrderedCounts<T> {
    entries: Vec<(T, usize)>,
}

impl<T: PartialEq> OrderedCounts<T> {
    const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn bump(&mut self, value: T) {
        if let Some(entry) = self.entries.iter_mut().find(|(v, _)| *v == value) {
            entry.1 += 1;
        } else {
            self.entries.push((value, 1));
        }
    }

    /// The most frequent value and its count; earliest-seen wins ties.
    fn top(&self) -> Option<(&T, usize)> {
        let mut best: Option<(&T, usize)> = None;
        for (value, count) in &self.entries {
            if best.is_none_or(|(_, best_count)| *count > best_count) {
                best = Some((value, *count));
            }
        }
        best
    }
}

/// Builds one [`Cluster`] per distinct non-negative label, sorted
/// descending by severity score (stable, so ties keep cluster-id order).
#[must_use]
pub fn annotate(
    points: &[IncidentPoint],
    labels: &[i32],
    config: &ClusteringConfig,
) -> Vec<Cluster> {
    // Single grouping pass: label -> member indices, in label order.
    let mut members: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        if label >= 0 {
            members.entry(label).or_default().push(idx);
        }
    }

    let mut clusters: Vec<Cluster> = members
        .into_iter()
        .map(|(cluster_id, indices)| annotate_one(points, cluster_id, &indices, config))
        .collect();

    clusters.sort_by(|a, b| {
        b.severity_score
            .partial_cmp(&a.severity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    clusters
}

fn annotate_one(
    points: &[IncidentPoint],
    cluster_id: i32,
    indices: &[usize],
    config: &ClusteringConfig,
) -> Cluster {
    let size = indices.len();

    let mut categories: OrderedCounts<&str> = OrderedCounts::new();
    let mut hours: OrderedCounts<u32> = OrderedCounts::new();
    let mut weight_sum = 0.0;
    let mut lat_sum = 0.0;
    let mut lon_sum = 0.0;

    for &idx in indices {
        let point = &points[idx];
        categories.bump(point.call_type.as_str());
        hours.bump(point.hour());
        weight_sum += config.weight(&point.call_type);
        lat_sum += point.lat;
        lon_sum += point.lon;
    }

    // indices is never empty: a label only exists because a point carries it.
    let (primary_type, primary_count) = categories
        .top()
        .map_or((String::new(), 0), |(t, c)| ((*t).to_string(), c));
    let peak_hour = hours.top().map_or(0, |(h, _)| *h);

    #[allow(clippy::cast_precision_loss)]
    let size_f = size as f64;
    #[allow(clippy::cast_precision_loss)]
    let primary_type_pct = round1(primary_count as f64 / size_f * 100.0);

    let size_factor = (size_f / SIZE_FACTOR_SCALE).min(SIZE_FACTOR_MAX);
    let severity_score = round1((weight_sum / size_f * size_factor * 10.0).min(10.0));

    Cluster {
        cluster_id,
        call_count: size,
        primary_type,
        primary_type_pct,
        peak_hour,
        severity_score,
        polygon: hull_ring(points, indices),
        center: ClusterCenter {
            lat: lat_sum / size_f,
            lon: lon_sum / size_f,
        },
    }
}

/// Convex hull of member coordinates as a closed `[lat, lon]` ring.
///
/// Returns `None` when the cluster has fewer than three distinct
/// coordinates or the hull degenerates to a line.
fn hull_ring(points: &[IncidentPoint], indices: &[usize]) -> Option<Vec<[f64; 2]>> {
    let mut distinct: Vec<[f64; 2]> = Vec::new();
    for &idx in indices {
        let coord = [points[idx].lon, points[idx].lat];
        if !distinct.contains(&coord) {
            distinct.push(coord);
        }
    }
    if distinct.len() < 3 {
        return None;
    }

    let multipoint: MultiPoint<f64> = distinct
        .iter()
        .map(|&[lon, lat]| Point::new(lon, lat))
        .collect();
    let hull = multipoint.convex_hull();
    let exterior = hull.exterior();

    // A proper hull ring has at least a closed triangle (4 coordinates);
    // collinear inputs collapse below that.
    if exterior.0.len() < 4 {
        return None;
    }

    Some(exterior.0.iter().map(|c| [c.y, c.x]).collect())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
