#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Day-level anomaly detection over emergency call volumes.
//!
//! Raw incidents are aggregated into one feature vector per calendar day,
//! scored by a seeded isolation forest, split into High/Medium severity by
//! a median over the flagged days, explained by configurable threshold
//! rules, and persisted through the [`AnomalyStore`] contract with
//! replace-all semantics.

pub mod detect;
pub mod features;
pub mod forest;
pub mod store;

use thiserror::Error;

use crisislens_anomaly_models::{AnomalyEvent, DetectorConfig};
use crisislens_incident_models::IncidentPoint;

pub use crate::detect::{detect, detect_with_model};
pub use crate::features::daily_features;
pub use crate::forest::{IsolationForest, OutlierModel, OutlierScores};
pub use crate::store::{AnomalyStore, MemoryAnomalyStore, StoreError};

/// Errors from the detection compute path.
#[derive(Debug, Error)]
pub enum AnomalyError {
    /// Too little history to fit the model meaningfully.
    #[error("Not enough history: {days} days available, {min_days} required")]
    NotEnoughDays {
        /// Days of history supplied.
        days: usize,
        /// Configured minimum.
        min_days: usize,
    },
}

/// Outcome of a full detection run.
///
/// Compute and persist are independently fallible: a failed write never
/// invalidates the computed events, so `events` is always the complete
/// result while `persistence` reports the store write on its own.
#[derive(Debug)]
pub struct DetectionRun {
    /// Every anomaly event the run produced.
    pub events: Vec<AnomalyEvent>,
    /// Result of writing the events through the store.
    pub persistence: Result<(), StoreError>,
}

/// Aggregates incidents, detects anomalies, and writes the result set
/// through `store` with replace-all semantics.
///
/// # Errors
///
/// Returns [`AnomalyError`] when detection itself fails; a store failure
/// is reported inside the returned [`DetectionRun`] instead.
pub fn run_detection(
    points: &[IncidentPoint],
    config: &DetectorConfig,
    store: &dyn AnomalyStore,
) -> Result<DetectionRun, AnomalyError> {
    let vectors = daily_features(points, config);
    log::info!("analyzing {} days", vectors.len());

    let events = detect(&vectors, config)?;
    let persistence = store.replace_all(&events);
    if let Err(err) = &persistence {
        log::error!("failed to persist anomaly events: {err}");
    }

    Ok(DetectionRun {
        events,
        persistence,
    })
}
