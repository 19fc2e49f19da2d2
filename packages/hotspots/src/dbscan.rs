//! Density-based spatial clustering over great-circle distance.
//!
//! Implements DBSCAN with a haversine metric. Candidate neighbors are
//! prefiltered through an R-tree envelope query (the same pattern the
//! boundary-attribution index uses) and then confirmed with an exact
//! great-circle distance check, so `eps_km` means kilometers on the
//! ground rather than degrees.

use std::collections::VecDeque;

use crisislens_hotspots_models::OUTLIER_LABEL;
use crisislens_incident_models::IncidentPoint;
use geo::{Distance as _, Haversine, Point};
use rstar::{AABB, RTree, primitives::GeomWithData};

/// Kilometers per degree of latitude.
const KM_PER_DEG_LAT: f64 = 110.574;
/// Kilometers per degree of longitude at the equator.
const KM_PER_DEG_LON: f64 = 111.320;

/// Capability interface for density clustering.
///
/// Returns one label per input point: a cluster id (>= 0) or
/// [`OUTLIER_LABEL`] for noise. Any conforming implementation may back
/// this contract.
pub trait SpatialClusterer {
    /// Assigns a cluster label to every point.
    fn cluster(&self, points: &[IncidentPoint]) -> Vec<i32>;
}

/// DBSCAN over haversine distance with an R-tree neighbor index.
///
/// A point is a core point when at least `min_samples` points (itself
/// included) lie within `eps_km`. Clusters are the transitive closure of
/// mutually reachable core points plus any border points one of them
/// reaches. Labels are deterministic for a fixed point ordering; a border
/// point reachable from two clusters goes to whichever core expands
/// first, which is an implementation-defined order.
#[derive(Debug, Clone, Copy)]
pub struct HaversineDbscan {
    eps_km: f64,
    min_samples: usize,
}

impl HaversineDbscan {
    /// Creates a clusterer with the given radius and density threshold.
    #[must_use]
    pub const fn new(eps_km: f64, min_samples: usize) -> Self {
        Self {
            eps_km,
            min_samples,
        }
    }

    /// Indices of all points within `eps_km` of point `idx`, itself included.
    fn neighbors(
        &self,
        points: &[IncidentPoint],
        index: &RTree<GeomWithData<[f64; 2], usize>>,
        idx: usize,
    ) -> Vec<usize> {
        let origin = &points[idx];

        // Envelope prefilter in degrees, then exact haversine confirm.
        let dlat = self.eps_km / KM_PER_DEG_LAT;
        let cos_lat = origin.lat.to_radians().cos().abs().max(1e-6);
        let dlon = self.eps_km / (KM_PER_DEG_LON * cos_lat);
        let envelope = AABB::from_corners(
            [origin.lon - dlon, origin.lat - dlat],
            [origin.lon + dlon, origin.lat + dlat],
        );

        let origin_point = Point::new(origin.lon, origin.lat);
        let eps_m = self.eps_km * 1000.0;

        let mut hits: Vec<usize> = index
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| {
                let [lon, lat] = *entry.geom();
                Haversine.distance(origin_point, Point::new(lon, lat)) <= eps_m
            })
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();
        hits
    }
}

impl SpatialClusterer for HaversineDbscan {
    fn cluster(&self, points: &[IncidentPoint]) -> Vec<i32> {
        let mut labels = vec![OUTLIER_LABEL; points.len()];
        if points.is_empty() || points.len() < self.min_samples {
            return labels;
        }

        let index = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| GeomWithData::new([p.lon, p.lat], i))
                .collect(),
        );

        let mut visited = vec![false; points.len()];
        let mut next_cluster = 0;

        for i in 0..points.len() {
            if visited[i] {
                continue;
            }
            visited[i] = true;

            let seeds = self.neighbors(points, &index, i);
            if seeds.len() < self.min_samples {
                continue;
            }

            let cluster_id = next_cluster;
            next_cluster += 1;
            labels[i] = cluster_id;

            let mut queue: VecDeque<usize> = seeds.into();
            while let Some(j) = queue.pop_front() {
                if labels[j] == OUTLIER_LABEL {
                    // Border point or unvisited: claim it for this cluster.
                    labels[j] = cluster_id;
                }
                if visited[j] {
                    continue;
                }
                visited[j] = true;

                let reachable = self.neighbors(points, &index, j);
                if reachable.len() >= self.min_samples {
                    // j is itself a core point; expand through it.
                    queue.extend(reachable);
                }
            }

            log::debug!(
                "cluster {cluster_id}: {} members",
                labels.iter().filter(|&&l| l == cluster_id).count()
            );
        }

        labels
    }
}
