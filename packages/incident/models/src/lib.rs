#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared incident record types used across the analytics pipeline.
//!
//! An [`IncidentPoint`] is the immutable input unit: a geotagged,
//! timestamped emergency call that has already been labeled with a
//! category by the upstream classification layer. This crate also owns
//! the day/night hour partition that the clustering, temporal-shift,
//! and anomaly components all share.

use chrono::{NaiveDateTime, Timelike as _};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Hour at which the daytime window opens (inclusive).
pub const DAY_START_HOUR: u32 = 6;
/// Hour at which the daytime window closes (exclusive).
pub const DAY_END_HOUR: u32 = 18;

/// A single geotagged, timestamped emergency call record.
///
/// Owned by the caller and read-only within the analytics core. The
/// category is a free-form label produced by the upstream classifier
/// (e.g. `"Fire"`, `"EMS"`, `"Traffic"`); severity weighting for
/// unknown labels falls back to a configured default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Category label assigned by the upstream classifier.
    pub call_type: String,
    /// Local timestamp of the call.
    pub timestamp: NaiveDateTime,
}

impl IncidentPoint {
    /// Creates a new incident point.
    #[must_use]
    pub fn new(
        lat: f64,
        lon: f64,
        call_type: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            lat,
            lon,
            call_type: call_type.into(),
            timestamp,
        }
    }

    /// Hour-of-day (0-23) of this incident.
    #[must_use]
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Returns `true` if this incident falls in the daytime window.
    #[must_use]
    pub fn is_daytime(&self) -> bool {
        is_day_hour(self.hour())
    }
}

/// Returns `true` if `hour` falls in the daytime window `[6, 18)`.
#[must_use]
pub const fn is_day_hour(hour: u32) -> bool {
    hour >= DAY_START_HOUR && hour < DAY_END_HOUR
}

/// Time-of-day window selector applied before clustering.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeWindow {
    /// No time-of-day filtering.
    #[default]
    All,
    /// Daytime calls only: hour in `[6, 18)`.
    Day,
    /// Nighttime calls only: hour in `[18, 24)` or `[0, 6)`.
    Night,
}

impl TimeWindow {
    /// Returns `true` if an incident at `hour` belongs to this window.
    #[must_use]
    pub const fn contains_hour(self, hour: u32) -> bool {
        match self {
            Self::All => true,
            Self::Day => is_day_hour(hour),
            Self::Night => !is_day_hour(hour),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr as _;

    use chrono::NaiveDate;

    fn at_hour(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    #[test]
    fn day_window_boundaries() {
        assert!(!is_day_hour(5));
        assert!(is_day_hour(6));
        assert!(is_day_hour(17));
        assert!(!is_day_hour(18));
        assert!(!is_day_hour(23));
        assert!(!is_day_hour(0));
    }

    #[test]
    fn time_window_partitions_hours() {
        for hour in 0..24 {
            assert!(TimeWindow::All.contains_hour(hour));
            assert_ne!(
                TimeWindow::Day.contains_hour(hour),
                TimeWindow::Night.contains_hour(hour)
            );
        }
    }

    #[test]
    fn incident_daytime_matches_partition() {
        let day = IncidentPoint::new(40.0, -75.0, "Fire", at_hour(12));
        let night = IncidentPoint::new(40.0, -75.0, "Fire", at_hour(2));
        assert!(day.is_daytime());
        assert!(!night.is_daytime());
    }

    #[test]
    fn time_window_parses_from_query_strings() {
        assert_eq!(TimeWindow::from_str("day").unwrap(), TimeWindow::Day);
        assert_eq!(TimeWindow::from_str("night").unwrap(), TimeWindow::Night);
        assert_eq!(TimeWindow::from_str("all").unwrap(), TimeWindow::All);
        assert_eq!(TimeWindow::Night.to_string(), "night");
    }
}
