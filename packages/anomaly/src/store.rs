//! Persistence contract for anomaly events.
//!
//! Each detection run recomputes over the complete history, so a write
//! replaces the entire stored set rather than merging. Readers must see
//! either the previous complete set or the new one, never a mix.

use std::sync::{PoisonError, RwLock};

use crisislens_anomaly_models::{AnomalyEvent, AnomalySeverity};
use thiserror::Error;

/// Errors from an anomaly store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or lost the operation.
    #[error("Anomaly store backend failed: {message}")]
    Backend {
        /// Description of what went wrong.
        message: String,
    },
}

/// Boundary to wherever anomaly events live between runs.
///
/// Dates are unique: at most one event per calendar day survives a write.
pub trait AnomalyStore: Send + Sync {
    /// Atomically replaces every stored event with `events`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend write fails; the previous
    /// set must remain intact in that case.
    fn replace_all(&self, events: &[AnomalyEvent]) -> Result<(), StoreError>;

    /// Lists events ordered by date descending, optionally filtered by
    /// severity and bounded by `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    fn list(
        &self,
        severity: Option<AnomalySeverity>,
        limit: Option<usize>,
    ) -> Result<Vec<AnomalyEvent>, StoreError>;
}

/// In-process store backed by a `RwLock`.
///
/// The lock gives replace-all its atomicity: a reader holding the read
/// guard sees one complete snapshot.
#[derive(Debug, Default)]
pub struct MemoryAnomalyStore {
    events: RwLock<Vec<AnomalyEvent>>,
}

impl MemoryAnomalyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnomalyStore for MemoryAnomalyStore {
    fn replace_all(&self, events: &[AnomalyEvent]) -> Result<(), StoreError> {
        let mut sorted = events.to_vec();
        sorted.sort_by_key(|e| e.date);
        sorted.dedup_by_key(|e| e.date);

        let mut guard = self.events.write().unwrap_or_else(PoisonError::into_inner);
        *guard = sorted;
        log::info!("stored {} anomaly events", guard.len());
        Ok(())
    }

    fn list(
        &self,
        severity: Option<AnomalySeverity>,
        limit: Option<usize>,
    ) -> Result<Vec<AnomalyEvent>, StoreError> {
        let guard = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let events = guard
            .iter()
            .rev()
            .filter(|e| severity.is_none_or(|s| e.severity == s))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, Utc};

    fn event(day: u32, severity: AnomalySeverity) -> AnomalyEvent {
        AnomalyEvent {
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            actual_calls: 650,
            anomaly_score: -0.2,
            severity,
            reason: "High volume (650 calls)".to_string(),
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn list_orders_by_date_descending() {
        let store = MemoryAnomalyStore::new();
        store
            .replace_all(&[
                event(3, AnomalySeverity::Medium),
                event(10, AnomalySeverity::High),
                event(7, AnomalySeverity::Medium),
            ])
            .unwrap();

        let dates: Vec<u32> = store
            .list(None, None)
            .unwrap()
            .iter()
            .map(|e| e.date.format("%d").to_string().parse().unwrap())
            .collect();
        assert_eq!(dates, vec![10, 7, 3]);
    }

    #[test]
    fn list_filters_by_severity_and_honors_limit() {
        let store = MemoryAnomalyStore::new();
        store
            .replace_all(&[
                event(1, AnomalySeverity::High),
                event(2, AnomalySeverity::Medium),
                event(3, AnomalySeverity::High),
                event(4, AnomalySeverity::High),
            ])
            .unwrap();

        let high = store.list(Some(AnomalySeverity::High), None).unwrap();
        assert_eq!(high.len(), 3);
        assert!(high.iter().all(|e| e.severity == AnomalySeverity::High));

        let limited = store.list(Some(AnomalySeverity::High), Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].date, NaiveDate::from_ymd_opt(2024, 4, 4).unwrap());
    }

    #[test]
    fn replace_all_is_destructive() {
        let store = MemoryAnomalyStore::new();
        store.replace_all(&[event(1, AnomalySeverity::High)]).unwrap();
        store.replace_all(&[event(2, AnomalySeverity::Medium)]).unwrap();

        let events = store.list(None, None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
    }

    #[test]
    fn duplicate_dates_collapse_to_one_event() {
        let store = MemoryAnomalyStore::new();
        store
            .replace_all(&[
                event(5, AnomalySeverity::High),
                event(5, AnomalySeverity::Medium),
            ])
            .unwrap();
        assert_eq!(store.list(None, None).unwrap().len(), 1);
    }
}
