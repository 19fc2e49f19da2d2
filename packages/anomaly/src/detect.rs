//! Detection run: score daily vectors, label severity, explain flags.

use chrono::Utc;
use crisislens_anomaly_models::{
    AnomalyEvent, AnomalySeverity, DailyFeatureVector, DetectorConfig, ReasonThresholds,
};

use crate::AnomalyError;
use crate::forest::{IsolationForest, OutlierModel, OutlierScores};

/// Runs anomaly detection with the default seeded isolation forest.
///
/// # Errors
///
/// Returns [`AnomalyError::NotEnoughDays`] when fewer than
/// `config.min_days` vectors are supplied; fitting on too little history
/// would flag arbitrary days rather than failing loudly.
pub fn detect(
    vectors: &[DailyFeatureVector],
    config: &DetectorConfig,
) -> Result<Vec<AnomalyEvent>, AnomalyError> {
    let model = IsolationForest::new(config.contamination, config.seed);
    detect_with_model(vectors, config, &model)
}

/// Runs anomaly detection with a caller-supplied scoring model.
///
/// Severity is a median split over the scores of this run's flagged days:
/// strictly below the median is `High`, the rest `Medium`. The boundary is
/// relative to the flagged set, so the same day can change severity
/// between runs over different histories.
///
/// # Errors
///
/// Returns [`AnomalyError::NotEnoughDays`] below the configured minimum.
pub fn detect_with_model(
    vectors: &[DailyFeatureVector],
    config: &DetectorConfig,
    model: &dyn OutlierModel,
) -> Result<Vec<AnomalyEvent>, AnomalyError> {
    if vectors.len() < config.min_days {
        return Err(AnomalyError::NotEnoughDays {
            days: vectors.len(),
            min_days: config.min_days,
        });
    }

    let rows: Vec<Vec<f64>> = vectors
        .iter()
        .map(|v| feature_row(v, &config.categories))
        .collect();
    let OutlierScores { scores, flags } = model.fit_score(&rows);

    let flagged_scores: Vec<f64> = scores
        .iter()
        .zip(&flags)
        .filter(|&(_, &flagged)| flagged)
        .map(|(&score, _)| score)
        .collect();
    let threshold = median(&flagged_scores);

    let detected_at = Utc::now();
    let events: Vec<AnomalyEvent> = vectors
        .iter()
        .zip(&scores)
        .zip(&flags)
        .filter(|&(_, &flagged)| flagged)
        .map(|((vector, &score), _)| AnomalyEvent {
            date: vector.date,
            actual_calls: vector.total_calls,
            anomaly_score: score,
            severity: if score < threshold {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            },
            reason: reason_text(vector, &config.thresholds),
            detected_at,
        })
        .collect();

    log::info!(
        "flagged {} of {} days as anomalous",
        events.len(),
        vectors.len()
    );
    Ok(events)
}

/// Feature layout fed to the model:
/// `[total_calls, pct per tracked category.., peak_hour_calls, night_pct]`.
#[allow(clippy::cast_precision_loss)]
fn feature_row(vector: &DailyFeatureVector, categories: &[String]) -> Vec<f64> {
    let mut row = Vec::with_capacity(categories.len() + 3);
    row.push(vector.total_calls as f64);
    for category in categories {
        row.push(vector.pct(category));
    }
    row.push(vector.peak_hour_calls as f64);
    row.push(vector.night_pct);
    row
}

/// Evaluates every reason rule against the day's raw features and joins
/// the matches; falls back to a generic phrase when nothing matches.
fn reason_text(vector: &DailyFeatureVector, thresholds: &ReasonThresholds) -> String {
    let mut reasons = Vec::new();

    if vector.total_calls > thresholds.volume_high {
        reasons.push(format!("High volume ({} calls)", vector.total_calls));
    } else if vector.total_calls < thresholds.volume_low {
        reasons.push(format!("Low volume ({} calls)", vector.total_calls));
    }

    for rule in &thresholds.category_rules {
        let pct = vector.pct(&rule.category);
        if let Some(high) = rule.high_pct
            && pct > high
        {
            reasons.push(format!("High {} calls ({pct:.1}%)", rule.category));
        }
        if let Some(low) = rule.low_pct
            && pct < low
        {
            reasons.push(format!("Low {} percentage ({pct:.1}%)", rule.category));
        }
    }

    if vector.night_pct > thresholds.night_pct_high {
        reasons.push(format!(
            "Unusual nighttime activity ({:.1}%)",
            vector.night_pct
        ));
    }

    if reasons.is_empty() {
        "Unusual call pattern detected".to_string()
    } else {
        reasons.join("; ")
    }
}

/// Median of an unsorted slice; 0 for an empty one.
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        f64::midpoint(sorted[mid - 1], sorted[mid])
    } else {
        sorted[mid]
    }
}
