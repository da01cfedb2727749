//! MetricSnapshot store
//!
//! Single source of truth for the fetched analytics state of one
//! dashboard instance. A [`MetricSnapshot`] is a versioned bundle
//! replaced atomically on each successful fetch cycle; it is never
//! mutated field-by-field, so readers can never observe a torn mix of
//! old and new data. A failed cycle keeps the last-known-good snapshot
//! and records a user-facing error message instead.
//!
//! The store is owned exclusively by one dashboard instance; ordering
//! rests on the generation counter, not on cross-instance locking.
//! Out-of-order fetch results carrying a generation at or below the
//! applied one are rejected.

use crate::alerts::Alert;
use crate::cohort::CohortRow;
use crate::funnel::Funnel;
use crate::service::{
    ActiveUserSummary, FeatureAdoption, KpiMetric, LearningAnalytics, SummaryMetrics, SystemHealth,
};
use crate::time_range::TimeRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Versioned bundle of everything one fetch cycle produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub summary: SummaryMetrics,
    pub feature_adoption: Vec<FeatureAdoption>,
    pub system_health: SystemHealth,
    pub active_users: ActiveUserSummary,
    pub funnel: Funnel,
    pub cohorts: Vec<CohortRow>,
    pub business_kpis: Vec<KpiMetric>,
    pub learning: LearningAnalytics,
    pub active_alerts: Vec<Alert>,
    pub range: TimeRange,
    pub fetched_at: DateTime<Utc>,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Option<Arc<MetricSnapshot>>,
    error: Option<String>,
    is_refreshing: bool,
    stale: bool,
    closed: bool,
    applied_generation: u64,
}

/// Owner of the current snapshot, error state and refresh flag
#[derive(Debug, Default)]
pub struct SnapshotStore {
    state: RwLock<StoreState>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest applied snapshot, if any fetch has succeeded yet
    pub async fn snapshot(&self) -> Option<Arc<MetricSnapshot>> {
        self.state.read().await.snapshot.clone()
    }

    /// User-facing message from the most recent failed cycle
    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn is_refreshing(&self) -> bool {
        self.state.read().await.is_refreshing
    }

    /// True after a range change until the next successful apply
    pub async fn is_stale(&self) -> bool {
        self.state.read().await.stale
    }

    pub async fn applied_generation(&self) -> u64 {
        self.state.read().await.applied_generation
    }

    pub async fn set_refreshing(&self, refreshing: bool) {
        let mut state = self.state.write().await;
        if !state.closed {
            state.is_refreshing = refreshing;
        }
    }

    /// Mark the current snapshot stale; it remains readable until the
    /// replacement lands
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        if !state.closed {
            state.stale = true;
        }
    }

    /// Atomically replace the snapshot
    ///
    /// Rejects the replacement when the store is closed or the
    /// snapshot's generation does not advance past the applied one, so
    /// an older fetch result arriving late can never overwrite a newer
    /// snapshot. Returns whether the snapshot was applied.
    pub async fn apply(&self, snapshot: MetricSnapshot) -> bool {
        let mut state = self.state.write().await;
        if state.closed || snapshot.generation <= state.applied_generation {
            return false;
        }
        state.applied_generation = snapshot.generation;
        state.snapshot = Some(Arc::new(snapshot));
        state.error = None;
        state.is_refreshing = false;
        state.stale = false;
        true
    }

    /// Record a failed cycle: snapshot untouched, error set, flags
    /// cleared. Returns whether the failure was recorded.
    pub async fn record_failure(&self, message: String) -> bool {
        let mut state = self.state.write().await;
        if state.closed {
            return false;
        }
        state.error = Some(message);
        state.is_refreshing = false;
        true
    }

    /// Shut the store; every later mutation is ignored
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.closed = true;
        state.is_refreshing = false;
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }
}
