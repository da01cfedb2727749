//! Test infrastructure for the dashboard core
//!
//! Provides a scriptable mock of the external analytics service plus
//! fixtures and data generators shared by the async test modules.
//!
//! The mock supports the scenarios the concurrency tests need:
//! - gated fetches (`hold_next_fetch`) so a cycle can be parked at its
//!   network suspension point and released later,
//! - one-shot failure injection (`fail_next_fetch`),
//! - scripted summary payloads so each cycle's data is identifiable,
//! - push-event injection and release accounting for the subscription.

use crate::alerts::{Alert, AlertSeverity, ThresholdCondition};
use crate::cohort::CohortRow;
use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::error::{DashboardError, Result};
use crate::events::LiveEvent;
use crate::funnel::StageCount;
use crate::service::{
    ActiveUserSummary, AnalyticsService, ConsumerStatus, EventSubscription, FeatureAdoption,
    FunnelPayload, KpiMetric, LearningAnalytics, ReportConfig, ReportHandle, SummaryMetrics,
    SystemHealth, TimeSeriesPoint,
};
use crate::time_range::{Granularity, TimeRange};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Scriptable in-memory analytics service
#[derive(Default)]
pub struct MockAnalyticsService {
    fetch_cycles: AtomicUsize,
    report_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    release_signals: Arc<AtomicUsize>,
    subscribe_fail: AtomicBool,
    holds: parking_lot::Mutex<VecDeque<oneshot::Receiver<()>>>,
    fail_queue: parking_lot::Mutex<VecDeque<String>>,
    summary_script: parking_lot::Mutex<VecDeque<SummaryMetrics>>,
    recent: parking_lot::Mutex<Vec<LiveEvent>>,
    alerts: parking_lot::Mutex<Vec<Alert>>,
    cohorts: parking_lot::Mutex<Vec<CohortRow>>,
    funnel_stages: parking_lot::Mutex<Vec<StageCount>>,
    event_tx: parking_lot::Mutex<Option<mpsc::Sender<LiveEvent>>>,
}

impl MockAnalyticsService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of fetch cycles started (one summary call per cycle)
    pub fn fetch_cycles(&self) -> usize {
        self.fetch_cycles.load(Ordering::SeqCst)
    }

    pub fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// How many times a subscription release has been signaled
    pub fn release_signals(&self) -> usize {
        self.release_signals.load(Ordering::SeqCst)
    }

    /// Park the next fetch cycle at its network boundary; sending on
    /// the returned channel lets it proceed
    pub fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.holds.lock().push_back(rx);
        tx
    }

    /// Make the next fetch cycle fail with `message`
    pub fn fail_next_fetch<S: Into<String>>(&self, message: S) {
        self.fail_queue.lock().push_back(message.into());
    }

    /// Queue a summary payload for the next fetch cycle
    pub fn script_summary(&self, summary: SummaryMetrics) {
        self.summary_script.lock().push_back(summary);
    }

    pub fn set_recent_events(&self, events: Vec<LiveEvent>) {
        *self.recent.lock() = events;
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        *self.alerts.lock() = alerts;
    }

    pub fn set_cohorts(&self, cohorts: Vec<CohortRow>) {
        *self.cohorts.lock() = cohorts;
    }

    pub fn set_funnel_stages(&self, stages: Vec<StageCount>) {
        *self.funnel_stages.lock() = stages;
    }

    /// Refuse the next `subscribe_events` call
    pub fn fail_subscribe(&self) {
        self.subscribe_fail.store(true, Ordering::SeqCst);
    }

    /// Push a live event through the open subscription
    pub async fn push_event(&self, event: LiveEvent) {
        let tx = self.event_tx.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl AnalyticsService for MockAnalyticsService {
    async fn summary_metrics(&self, _range: TimeRange) -> Result<SummaryMetrics> {
        self.fetch_cycles.fetch_add(1, Ordering::SeqCst);

        // Claim this call's plan up front so an overlapping later cycle
        // cannot steal the payload scripted for this one
        let failure = self.fail_queue.lock().pop_front();
        let scripted = self.summary_script.lock().pop_front();
        let hold = self.holds.lock().pop_front();

        if let Some(hold) = hold {
            let _ = hold.await;
        }
        if let Some(message) = failure {
            return Err(DashboardError::fetch(message));
        }
        Ok(scripted.unwrap_or_else(|| summary_with_users(1000)))
    }

    async fn feature_adoption(&self) -> Result<Vec<FeatureAdoption>> {
        Ok(vec![FeatureAdoption {
            feature: "live_lessons".to_string(),
            adoption_rate_percent: 42.0,
            users: 420,
            total_users: 1000,
        }])
    }

    async fn recent_events(&self, limit: usize) -> Result<Vec<LiveEvent>> {
        let recent = self.recent.lock().clone();
        Ok(recent.into_iter().take(limit).collect())
    }

    async fn system_health(&self) -> Result<SystemHealth> {
        Ok(SystemHealth {
            consumer_status: ConsumerStatus {
                is_running: true,
                events_processed: 12_000,
                events_per_minute: 35.0,
            },
            queue_depth: 3,
        })
    }

    async fn time_series(
        &self,
        _metric: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _granularity: Granularity,
    ) -> Result<Vec<TimeSeriesPoint>> {
        Ok(vec![TimeSeriesPoint {
            period: start,
            value: 1.0,
        }])
    }

    async fn dau_wau_mau(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<ActiveUserSummary> {
        Ok(ActiveUserSummary::default())
    }

    async fn active_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.alerts.lock().clone())
    }

    async fn business_kpis(&self, _range: TimeRange) -> Result<Vec<KpiMetric>> {
        Ok(vec![KpiMetric {
            name: "weekly_revenue".to_string(),
            value: 1234.5,
            trend_percent: Some(3.2),
        }])
    }

    async fn conversion_funnel(&self, _range: TimeRange) -> Result<FunnelPayload> {
        let stages = {
            let configured = self.funnel_stages.lock();
            if configured.is_empty() {
                stage_counts(&[("visited", 1000), ("signed_up", 400), ("activated", 100)])
            } else {
                configured.clone()
            }
        };
        Ok(FunnelPayload {
            stages,
            dropoff_points: Vec::new(),
        })
    }

    async fn learning_analytics(&self, _range: TimeRange) -> Result<LearningAnalytics> {
        Ok(LearningAnalytics {
            lessons_started: 300,
            lessons_completed: 180,
            average_completion_minutes: 17.5,
            completion_rate_percent: 60.0,
        })
    }

    async fn retention_cohorts(&self, _range: TimeRange) -> Result<Vec<CohortRow>> {
        Ok(self.cohorts.lock().clone())
    }

    async fn subscribe_events(&self) -> Result<EventSubscription> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.subscribe_fail.load(Ordering::SeqCst) {
            return Err(DashboardError::subscription("push channel refused"));
        }

        let (event_tx, event_rx) = mpsc::channel(64);
        let (release_tx, release_rx) = oneshot::channel();
        *self.event_tx.lock() = Some(event_tx);

        let release_signals = Arc::clone(&self.release_signals);
        tokio::spawn(async move {
            if release_rx.await.is_ok() {
                release_signals.fetch_add(1, Ordering::SeqCst);
            }
        });

        Ok(EventSubscription::new(event_rx, release_tx))
    }

    async fn generate_report(&self, _config: ReportConfig) -> Result<ReportHandle> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReportHandle {
            download_url: "https://analytics.example.test/reports/42.csv".to_string(),
        })
    }
}

/// Dashboard fixture over the mock service
///
/// The dashboard is Arc-wrapped so tests can spawn concurrent calls
/// against it.
pub struct DashboardTestFixture {
    pub service: Arc<MockAnalyticsService>,
    pub dashboard: Arc<Dashboard<MockAnalyticsService>>,
}

impl DashboardTestFixture {
    pub async fn mount() -> Result<Self> {
        Self::mount_with_config(DashboardConfig::default()).await
    }

    pub async fn mount_with_config(config: DashboardConfig) -> Result<Self> {
        let service = MockAnalyticsService::new();
        let dashboard = Arc::new(Dashboard::mount(Arc::clone(&service), config).await?);
        Ok(Self { service, dashboard })
    }

    pub async fn mount_with_service(
        service: Arc<MockAnalyticsService>,
        config: DashboardConfig,
    ) -> Result<Self> {
        let dashboard = Arc::new(Dashboard::mount(Arc::clone(&service), config).await?);
        Ok(Self { service, dashboard })
    }
}

/// Summary payload whose `total_users` identifies the cycle it came from
pub fn summary_with_users(total_users: u64) -> SummaryMetrics {
    SummaryMetrics {
        total_users,
        active_today: total_users / 4,
        lessons_created: 80,
        completion_rate: 61.5,
        trends: None,
    }
}

pub fn stage_counts(counts: &[(&str, u64)]) -> Vec<StageCount> {
    counts
        .iter()
        .map(|(name, user_count)| StageCount {
            name: name.to_string(),
            user_count: *user_count,
        })
        .collect()
}

pub fn test_alert(rule: &str, severity: AlertSeverity, age_minutes: i64) -> Alert {
    Alert {
        id: Uuid::new_v4(),
        rule_name: rule.to_string(),
        metric: "error_rate".to_string(),
        current_value: 12.0,
        threshold_condition: ThresholdCondition::Above,
        threshold_value: 5.0,
        severity,
        triggered_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

pub fn test_events(types: &[&str]) -> Vec<LiveEvent> {
    types.iter().map(|t| LiveEvent::new(*t)).collect()
}
