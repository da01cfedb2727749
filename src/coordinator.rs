//! Refresh coordinator
//!
//! Arbitrates the three refresh trigger sources (interval timer, manual
//! refresh, time-range change) into at most one in-flight
//! fetch-and-apply cycle per dashboard instance.
//!
//! # Coalescing and supersedence
//!
//! A request arriving while a cycle is in flight attaches to that
//! cycle's completion instead of starting a second one. The exception
//! is an actual range change: the in-flight cycle is fetching data for
//! the old range, so `set_range` starts a fresh cycle immediately and
//! the superseded cycle's result is discarded when it lands. The
//! supersede path is reachable only through `set_range`, which filters
//! out redundant re-selection first; timer and manual triggers always
//! coalesce.
//!
//! # Generation counter
//!
//! Every cycle carries a monotonically increasing generation. A fetch
//! result is applied only if its generation is still the latest issued
//! and advances past the store's applied generation, so an
//! out-of-order-arriving older result can never overwrite a newer
//! snapshot.
//!
//! # Failure policy
//!
//! A failed cycle records a user-facing error and leaves the previous
//! snapshot in place. Nothing is retried automatically; the next timer
//! tick or a manual refresh is the retry path.

use crate::error::Result;
use crate::funnel::compute_funnel;
use crate::service::AnalyticsService;
use crate::snapshot::{MetricSnapshot, SnapshotStore};
use crate::time_range::{RangeSelector, TimeRange};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, MutexGuard};

/// Which trigger source asked for the refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Timer,
    Manual,
}

/// How a refresh cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cycle's snapshot was applied to the store
    Applied,
    /// The cycle failed; the previous snapshot was preserved
    Failed(String),
    /// A newer cycle superseded this one; its result was discarded
    Superseded,
    /// The dashboard was torn down before the result could land
    TornDown,
}

/// Result of a `request_refresh` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshResult {
    pub generation: u64,
    /// True when this call attached to an already in-flight cycle
    pub coalesced: bool,
    pub outcome: RefreshOutcome,
}

/// Notification sent to presentation-layer subscribers on each applied
/// snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotUpdate {
    pub generation: u64,
    pub range: TimeRange,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CycleDone {
    generation: u64,
    outcome: RefreshOutcome,
}

/// What started a cycle; range changes are internal to `set_range`
#[derive(Debug, Clone, Copy)]
enum CycleTrigger {
    Requested(RefreshReason),
    RangeChange,
}

struct Inflight {
    generation: u64,
    trigger: CycleTrigger,
    done: watch::Receiver<Option<CycleDone>>,
}

/// Serializes fetch-and-apply cycles for one dashboard instance
pub struct RefreshCoordinator<S: AnalyticsService> {
    service: Arc<S>,
    store: Arc<SnapshotStore>,
    range: parking_lot::Mutex<RangeSelector>,
    generation: AtomicU64,
    inflight: Mutex<Option<Inflight>>,
    update_tx: broadcast::Sender<SnapshotUpdate>,
    closed: AtomicBool,
}

impl<S: AnalyticsService> RefreshCoordinator<S> {
    pub fn new(
        service: Arc<S>,
        store: Arc<SnapshotStore>,
        initial_range: TimeRange,
        update_channel_capacity: usize,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(update_channel_capacity.max(1));
        Self {
            service,
            store,
            range: parking_lot::Mutex::new(RangeSelector::new(initial_range)),
            generation: AtomicU64::new(0),
            inflight: Mutex::new(None),
            update_tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Active reporting window
    pub fn range(&self) -> TimeRange {
        self.range.lock().active()
    }

    /// Subscribe to applied-snapshot notifications
    pub fn subscribe_updates(&self) -> broadcast::Receiver<SnapshotUpdate> {
        self.update_tx.subscribe()
    }

    /// Switch the reporting window
    ///
    /// Selecting the already-active range is a no-op and returns
    /// `None`: no refetch, no update dispatch. An actual change marks
    /// the current snapshot stale and runs exactly one refresh cycle,
    /// superseding any cycle already in flight.
    pub async fn set_range(&self, range: TimeRange) -> Result<Option<RefreshResult>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(crate::error::DashboardError::TornDown);
        }

        let changed = self.range.lock().select(range);
        if !changed {
            tracing::debug!(?range, "range unchanged, skipping refresh");
            return Ok(None);
        }

        self.store.invalidate().await;

        let guard = self.inflight.lock().await;
        if let Some(inflight) = guard.as_ref() {
            tracing::debug!(
                superseded_generation = inflight.generation,
                superseded_trigger = ?inflight.trigger,
                "range change supersedes in-flight refresh"
            );
        }
        let result = self.launch_cycle(guard, CycleTrigger::RangeChange).await?;
        Ok(Some(result))
    }

    /// Request a fetch-and-apply cycle
    ///
    /// Always coalesces onto an in-flight cycle; only `set_range` can
    /// supersede one, and only after an actual range change.
    pub async fn request_refresh(&self, reason: RefreshReason) -> Result<RefreshResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(RefreshResult {
                generation: self.generation.load(Ordering::SeqCst),
                coalesced: false,
                outcome: RefreshOutcome::TornDown,
            });
        }

        let guard = self.inflight.lock().await;
        if let Some(inflight) = guard.as_ref() {
            let mut done_rx = inflight.done.clone();
            let inflight_generation = inflight.generation;
            drop(guard);
            tracing::debug!(
                ?reason,
                generation = inflight_generation,
                "coalescing onto in-flight refresh"
            );
            return Ok(Self::await_cycle(inflight_generation, &mut done_rx).await);
        }

        self.launch_cycle(guard, CycleTrigger::Requested(reason)).await
    }

    /// Issue the next generation and run its cycle, replacing whatever
    /// `guard` currently holds
    async fn launch_cycle(
        &self,
        mut guard: MutexGuard<'_, Option<Inflight>>,
        trigger: CycleTrigger,
    ) -> Result<RefreshResult> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (done_tx, done_rx) = watch::channel(None);
        *guard = Some(Inflight {
            generation,
            trigger,
            done: done_rx,
        });
        drop(guard);

        self.store.set_refreshing(true).await;
        let outcome = self.run_cycle(generation).await;

        {
            let mut guard = self.inflight.lock().await;
            if guard.as_ref().map(|i| i.generation) == Some(generation) {
                *guard = None;
            }
        }
        let _ = done_tx.send(Some(CycleDone {
            generation,
            outcome: outcome.clone(),
        }));

        Ok(RefreshResult {
            generation,
            coalesced: false,
            outcome,
        })
    }

    /// Mark the coordinator closed; in-flight results are dropped
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn await_cycle(
        generation: u64,
        done_rx: &mut watch::Receiver<Option<CycleDone>>,
    ) -> RefreshResult {
        loop {
            if let Some(done) = done_rx.borrow().clone() {
                return RefreshResult {
                    generation: done.generation,
                    coalesced: true,
                    outcome: done.outcome,
                };
            }
            if done_rx.changed().await.is_err() {
                return RefreshResult {
                    generation,
                    coalesced: true,
                    outcome: RefreshOutcome::TornDown,
                };
            }
        }
    }

    async fn run_cycle(&self, generation: u64) -> RefreshOutcome {
        let range = self.range.lock().active();
        let fetched = self.fetch_batch(range).await;

        if self.closed.load(Ordering::SeqCst) {
            tracing::debug!(generation, "dropping fetch result after teardown");
            return RefreshOutcome::TornDown;
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding superseded fetch result");
            return RefreshOutcome::Superseded;
        }

        match fetched {
            Ok(snapshot_parts) => {
                let fetched_at = Utc::now();
                let update = SnapshotUpdate {
                    generation,
                    range,
                    fetched_at,
                };
                let snapshot = snapshot_parts.into_snapshot(range, fetched_at, generation);
                if self.store.apply(snapshot).await {
                    tracing::debug!(generation, ?range, "snapshot applied");
                    let _ = self.update_tx.send(update);
                    RefreshOutcome::Applied
                } else {
                    RefreshOutcome::Superseded
                }
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(
                    generation,
                    error = %err,
                    "refresh cycle failed, keeping last snapshot"
                );
                self.store.record_failure(message.clone()).await;
                RefreshOutcome::Failed(message)
            }
        }
    }

    async fn fetch_batch(&self, range: TimeRange) -> Result<FetchedParts> {
        let window = range.window();
        let (
            summary,
            feature_adoption,
            system_health,
            active_users,
            active_alerts,
            funnel_payload,
            cohorts,
            business_kpis,
            learning,
        ) = tokio::try_join!(
            self.service.summary_metrics(range),
            self.service.feature_adoption(),
            self.service.system_health(),
            self.service.dau_wau_mau(window.start, window.end),
            self.service.active_alerts(),
            self.service.conversion_funnel(range),
            self.service.retention_cohorts(range),
            self.service.business_kpis(range),
            self.service.learning_analytics(range),
        )?;

        Ok(FetchedParts {
            summary,
            feature_adoption,
            system_health,
            active_users,
            active_alerts,
            funnel: compute_funnel(&funnel_payload.stages),
            cohorts,
            business_kpis,
            learning,
        })
    }
}

struct FetchedParts {
    summary: crate::service::SummaryMetrics,
    feature_adoption: Vec<crate::service::FeatureAdoption>,
    system_health: crate::service::SystemHealth,
    active_users: crate::service::ActiveUserSummary,
    active_alerts: Vec<crate::alerts::Alert>,
    funnel: crate::funnel::Funnel,
    cohorts: Vec<crate::cohort::CohortRow>,
    business_kpis: Vec<crate::service::KpiMetric>,
    learning: crate::service::LearningAnalytics,
}

impl FetchedParts {
    fn into_snapshot(
        self,
        range: TimeRange,
        fetched_at: DateTime<Utc>,
        generation: u64,
    ) -> MetricSnapshot {
        MetricSnapshot {
            summary: self.summary,
            feature_adoption: self.feature_adoption,
            system_health: self.system_health,
            active_users: self.active_users,
            funnel: self.funnel,
            cohorts: self.cohorts,
            business_kpis: self.business_kpis,
            learning: self.learning,
            active_alerts: self.active_alerts,
            range,
            fetched_at,
            generation,
        }
    }
}
