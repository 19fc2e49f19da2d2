//! Daily feature aggregation over raw incident records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use crisislens_anomaly_models::{DailyFeatureVector, DetectorConfig};
use crisislens_incident_models::IncidentPoint;

/// Per-day accumulator filled in a single pass over the batch.
#[derive(Default)]
struct DayAccumulator {
    total: usize,
    by_category: BTreeMap<String, usize>,
    by_hour: [usize; 24],
    night: usize,
}

/// Aggregates incidents into one [`DailyFeatureVector`] per calendar day.
///
/// Only days with at least one incident appear, so every percentage has a
/// non-zero denominator. Tracked categories missing from a day count as 0;
/// untracked categories contribute to the total but get no column of
/// their own. Output is ordered by date ascending.
#[must_use]
pub fn daily_features(points: &[IncidentPoint], config: &DetectorConfig) -> Vec<DailyFeatureVector> {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for point in points {
        let day = days.entry(point.timestamp.date()).or_default();
        day.total += 1;
        day.by_hour[point.hour() as usize] += 1;
        if !point.is_daytime() {
            day.night += 1;
        }
        if config.categories.iter().any(|c| c == &point.call_type) {
            *day.by_category.entry(point.call_type.clone()).or_default() += 1;
        }
    }

    days.into_iter()
        .map(|(date, acc)| {
            #[allow(clippy::cast_precision_loss)]
            let total = acc.total as f64;

            let mut category_calls = BTreeMap::new();
            let mut category_pct = BTreeMap::new();
            for category in &config.categories {
                let count = acc.by_category.get(category).copied().unwrap_or(0);
                category_calls.insert(category.clone(), count);
                #[allow(clippy::cast_precision_loss)]
                category_pct.insert(category.clone(), round2(count as f64 / total * 100.0));
            }

            #[allow(clippy::cast_precision_loss)]
            let night_pct = round2(acc.night as f64 / total * 100.0);

            DailyFeatureVector {
                date,
                total_calls: acc.total,
                category_calls,
                category_pct,
                peak_hour_calls: acc.by_hour.iter().copied().max().unwrap_or(0),
                night_calls: acc.night,
                night_pct,
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDateTime, Timelike as _};

    fn incident(day: u32, hour: u32, call_type: &str) -> IncidentPoint {
        let timestamp: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 10, 0)
            .unwrap();
        assert_eq!(timestamp.hour(), hour);
        IncidentPoint::new(39.95, -75.16, call_type, timestamp)
    }

    #[test]
    fn one_vector_per_day_with_calls() {
        let points = vec![
            incident(1, 9, "EMS"),
            incident(1, 10, "Fire"),
            incident(3, 22, "EMS"),
        ];
        let vectors = daily_features(&points, &DetectorConfig::default());

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(vectors[0].total_calls, 2);
        assert_eq!(vectors[1].date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
        assert_eq!(vectors[1].total_calls, 1);
    }

    #[test]
    fn percentages_are_rounded_to_two_decimals() {
        // 1 of 3 calls is Fire: 33.333...% -> 33.33.
        let points = vec![
            incident(1, 9, "Fire"),
            incident(1, 10, "EMS"),
            incident(1, 11, "EMS"),
        ];
        let vectors = daily_features(&points, &DetectorConfig::default());

        assert!((vectors[0].pct("Fire") - 33.33).abs() < f64::EPSILON);
        assert!((vectors[0].pct("EMS") - 66.67).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_tracked_categories_default_to_zero() {
        let points = vec![incident(1, 9, "EMS")];
        let vectors = daily_features(&points, &DetectorConfig::default());

        assert_eq!(vectors[0].category_calls["Fire"], 0);
        assert!(vectors[0].pct("Fire").abs() < f64::EPSILON);
        assert_eq!(vectors[0].category_calls["Traffic"], 0);
    }

    #[test]
    fn untracked_categories_count_toward_total_only() {
        let points = vec![incident(1, 9, "EMS"), incident(1, 9, "Llama Loose")];
        let vectors = daily_features(&points, &DetectorConfig::default());

        assert_eq!(vectors[0].total_calls, 2);
        assert!(!vectors[0].category_calls.contains_key("Llama Loose"));
        assert!((vectors[0].pct("EMS") - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn night_and_peak_hour_features() {
        let points = vec![
            incident(1, 2, "EMS"),
            incident(1, 23, "EMS"),
            incident(1, 14, "EMS"),
            incident(1, 14, "Fire"),
        ];
        let vectors = daily_features(&points, &DetectorConfig::default());

        assert_eq!(vectors[0].night_calls, 2);
        assert!((vectors[0].night_pct - 50.0).abs() < f64::EPSILON);
        assert_eq!(vectors[0].peak_hour_calls, 2);
    }

    #[test]
    fn empty_batch_yields_no_vectors() {
        assert!(daily_features(&[], &DetectorConfig::default()).is_empty());
    }
}
