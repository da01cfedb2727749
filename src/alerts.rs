//! Alert surface
//!
//! Display-side filtering and ranking of active alerts. Alerts are
//! created and resolved by the external alert service; this core never
//! mutates alert state, it only orders the latest fetched active set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert severity, ordered so `Critical` ranks highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Direction of the threshold breach that triggered the rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdCondition {
    Above,
    Below,
}

/// An active alert as reported by the alert service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub rule_name: String,
    pub metric: String,
    pub current_value: f64,
    pub threshold_condition: ThresholdCondition,
    pub threshold_value: f64,
    pub severity: AlertSeverity,
    pub triggered_at: DateTime<Utc>,
}

/// Rank alerts by severity descending, most recently triggered first
/// within a severity
///
/// Returns a new ordering; the underlying set is untouched so a
/// "view all" action can still reach every active alert.
pub fn rank_active_alerts(alerts: &[Alert]) -> Vec<Alert> {
    let mut ranked = alerts.to_vec();
    ranked.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.triggered_at.cmp(&a.triggered_at))
    });
    ranked
}

/// Truncated view of a ranked alert list
pub fn top_alerts(ranked: &[Alert], limit: usize) -> &[Alert] {
    &ranked[..ranked.len().min(limit)]
}
