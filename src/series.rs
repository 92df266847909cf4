//! Rolling-series upsert engine.
//!
//! A series is an ordered, period-deduplicated sequence of
//! observations. Mutation goes through [`upsert`] only: replace an
//! existing entry for the same period in place, otherwise append, then
//! trim to the retention window.

use crate::models::Observation;

/// Number of periods a series retains.
pub const RETENTION_WINDOW: usize = 24;

/// Merge one observation into a series.
///
/// If an entry with the same period exists it is replaced in place,
/// preserving its position; otherwise the entry is appended. The result
/// is then truncated to the last [`RETENTION_WINDOW`] entries by
/// position. Truncation is purely positional, so callers are expected
/// to insert in non-decreasing period order (replacement itself is
/// order-agnostic).
pub fn upsert<T: Observation>(series: Vec<T>, entry: T) -> Vec<T> {
    upsert_with_window(series, entry, RETENTION_WINDOW)
}

/// [`upsert`] with an explicit retention window.
pub fn upsert_with_window<T: Observation>(mut series: Vec<T>, entry: T, window: usize) -> Vec<T> {
    match series.iter().position(|e| e.period() == entry.period()) {
        Some(idx) => series[idx] = entry,
        None => series.push(entry),
    }

    let len = series.len();
    if len > window {
        series.drain(..len - window);
    }
    series
}

/// The most recent entry of a series, if any.
pub fn latest<T: Observation>(series: &[T]) -> Option<&T> {
    series.last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Period, SupplyEntry};

    fn entry(date: &str, total: f64) -> SupplyEntry {
        let date: Period = date.parse().unwrap();
        SupplyEntry::new(date, total, 0.0, 0.0, 18.5, 0.0)
    }

    #[test]
    fn test_upsert_appends_new_period() {
        let series = vec![entry("2025-01", 100.0)];
        let result = upsert(series, entry("2025-02", 110.0));

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].date.as_str(), "2025-02");
    }

    #[test]
    fn test_upsert_replaces_existing_period_in_place() {
        let series = vec![
            entry("2025-01", 100.0),
            entry("2025-02", 110.0),
            entry("2025-03", 120.0),
        ];
        let result = upsert(series, entry("2025-02", 999.0));

        assert_eq!(result.len(), 3);
        assert_eq!(result[1].date.as_str(), "2025-02");
        assert_eq!(result[1].usdc, 999.0);
        // Neighbors untouched
        assert_eq!(result[0].usdc, 100.0);
        assert_eq!(result[2].usdc, 120.0);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let series = vec![entry("2025-01", 100.0)];
        let once = upsert(series, entry("2025-02", 110.0));
        let twice = upsert(once.clone(), entry("2025-02", 110.0));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_upsert_into_empty_series() {
        let result = upsert(Vec::new(), entry("2025-01", 100.0));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_retention_window_bound() {
        let mut series = Vec::new();
        for year in 2023..2026 {
            for month in 1..=12 {
                let key = format!("{year}-{month:02}");
                series = upsert(series, entry(&key, 100.0));
                assert!(series.len() <= RETENTION_WINDOW);
            }
        }
        assert_eq!(series.len(), RETENTION_WINDOW);
        // Oldest retained is 36 - 24 = 12 months in
        assert_eq!(series[0].date.as_str(), "2024-01");
        assert_eq!(series.last().unwrap().date.as_str(), "2025-12");
    }

    #[test]
    fn test_truncation_is_positional() {
        // Out-of-order insertion: truncation keeps the positional tail,
        // not the chronologically newest entries.
        let mut series = Vec::new();
        for month in 1..=12 {
            series = upsert_with_window(series, entry(&format!("2025-{month:02}"), 1.0), 3);
        }
        series = upsert_with_window(series, entry("2024-01", 1.0), 3);

        let keys: Vec<&str> = series.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(keys, vec!["2025-11", "2025-12", "2024-01"]);
    }

    #[test]
    fn test_replace_does_not_grow_series_at_window() {
        let mut series = Vec::new();
        for month in 1..=12 {
            series = upsert_with_window(series, entry(&format!("2025-{month:02}"), 1.0), 12);
        }
        let before = series.len();
        series = upsert_with_window(series, entry("2025-06", 42.0), 12);
        assert_eq!(series.len(), before);
        assert_eq!(series[5].usdc, 42.0);
    }

    #[test]
    fn test_latest() {
        assert!(latest::<SupplyEntry>(&[]).is_none());
        let series = vec![entry("2025-01", 1.0), entry("2025-02", 2.0)];
        assert_eq!(latest(&series).unwrap().date.as_str(), "2025-02");
    }
}
