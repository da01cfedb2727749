//! Cohort-retention presentation
//!
//! Pure transformations over cohort rows: retention percentages per
//! day offset, cross-cohort averages, and the color band a retention
//! cell falls into. All functions are total; empty input and
//! zero-member cohorts yield 0, never NaN.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Day offsets at which retention is tracked
pub const RETENTION_OFFSETS: [u32; 7] = [0, 1, 7, 14, 30, 60, 90];

/// One cohort: users who started on the same date, with retained-user
/// counts at fixed day offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortRow {
    pub cohort_start_date: NaiveDate,
    pub total_users: u64,
    pub retention_by_offset: BTreeMap<u32, u64>,
}

impl CohortRow {
    /// Retention percentage at `day_offset` (0 when the cohort is empty
    /// or the offset was never recorded)
    pub fn retention_percent(&self, day_offset: u32) -> f64 {
        if self.total_users == 0 {
            return 0.0;
        }
        let retained = self.retention_by_offset.get(&day_offset).copied().unwrap_or(0);
        retained as f64 / self.total_users as f64 * 100.0
    }
}

/// Arithmetic mean of per-cohort retention at `day_offset`
///
/// Returns 0 for an empty cohort sequence; cohorts with zero members
/// contribute 0 to the mean.
pub fn average_retention(cohorts: &[CohortRow], day_offset: u32) -> f64 {
    if cohorts.is_empty() {
        return 0.0;
    }
    let sum: f64 = cohorts
        .iter()
        .map(|cohort| cohort.retention_percent(day_offset))
        .sum();
    sum / cohorts.len() as f64
}

/// Color band for a retention cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionBand {
    Band80Plus,
    Band60To79,
    Band40To59,
    Band20To39,
    BandUnder20,
}

/// Band for a retention percentage; thresholds are inclusive lower
/// bounds at 80/60/40/20
pub fn retention_color_band(percent: f64) -> RetentionBand {
    if percent >= 80.0 {
        RetentionBand::Band80Plus
    } else if percent >= 60.0 {
        RetentionBand::Band60To79
    } else if percent >= 40.0 {
        RetentionBand::Band40To59
    } else if percent >= 20.0 {
        RetentionBand::Band20To39
    } else {
        RetentionBand::BandUnder20
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohort(start: &str, total_users: u64, retention: &[(u32, u64)]) -> CohortRow {
        CohortRow {
            cohort_start_date: start.parse().unwrap(),
            total_users,
            retention_by_offset: retention.iter().copied().collect(),
        }
    }

    #[test]
    fn test_average_retention_empty_is_zero() {
        for offset in RETENTION_OFFSETS {
            assert_eq!(average_retention(&[], offset), 0.0);
        }
    }

    #[test]
    fn test_average_retention_reference_scenario() {
        let cohorts = vec![
            cohort("2026-07-01", 100, &[(7, 50)]),
            cohort("2026-07-08", 200, &[(7, 150)]),
        ];
        // (50% + 75%) / 2
        assert!((average_retention(&cohorts, 7) - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_cohort_contributes_zero() {
        let cohorts = vec![
            cohort("2026-07-01", 0, &[(7, 0)]),
            cohort("2026-07-08", 100, &[(7, 80)]),
        ];
        assert!((average_retention(&cohorts, 7) - 40.0).abs() < 1e-9);

        let only_empty = vec![cohort("2026-07-01", 0, &[])];
        let avg = average_retention(&only_empty, 30);
        assert_eq!(avg, 0.0);
        assert!(avg.is_finite());
    }

    #[test]
    fn test_missing_offset_counts_as_zero() {
        let row = cohort("2026-07-01", 50, &[(0, 50), (1, 25)]);
        assert_eq!(row.retention_percent(90), 0.0);
        assert!((row.retention_percent(1) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_band_thresholds_are_inclusive_lower_bounds() {
        assert_eq!(retention_color_band(80.0), RetentionBand::Band80Plus);
        assert_eq!(retention_color_band(79.99), RetentionBand::Band60To79);
        assert_eq!(retention_color_band(60.0), RetentionBand::Band60To79);
        assert_eq!(retention_color_band(59.99), RetentionBand::Band40To59);
        assert_eq!(retention_color_band(40.0), RetentionBand::Band40To59);
        assert_eq!(retention_color_band(20.0), RetentionBand::Band20To39);
        assert_eq!(retention_color_band(19.99), RetentionBand::BandUnder20);
        assert_eq!(retention_color_band(0.0), RetentionBand::BandUnder20);
        assert_eq!(retention_color_band(100.0), RetentionBand::Band80Plus);
    }
}
