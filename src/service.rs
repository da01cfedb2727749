//! External analytics service contract
//!
//! The dashboard core is a consumer of a remote analytics service; this
//! module pins down that boundary as a trait plus the wire data types.
//! Hosts implement [`AnalyticsService`] over whatever transport they
//! have (HTTP, RPC, in-process), and tests mock it.
//!
//! Every optional piece of a response is an explicit `Option` with a
//! total accessor defining the missing-field behavior, so no caller
//! ever has to guess what an absent `trends` block means.

use crate::alerts::Alert;
use crate::cohort::CohortRow;
use crate::error::Result;
use crate::events::LiveEvent;
use crate::funnel::{DropoffPoint, StageCount};
use crate::time_range::{Granularity, TimeRange};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Percentage trends accompanying the summary metrics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendSet {
    pub total_users_percent: f64,
    pub active_today_percent: f64,
    pub lessons_created_percent: f64,
    pub completion_rate_percent: f64,
}

/// Top-line summary metrics for the active range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_users: u64,
    pub active_today: u64,
    pub lessons_created: u64,
    pub completion_rate: f64,
    #[serde(default)]
    pub trends: Option<TrendSet>,
}

impl SummaryMetrics {
    /// Trends, with a missing block treated as 0% across the board
    pub fn trends(&self) -> TrendSet {
        self.trends.unwrap_or_default()
    }
}

/// Adoption figures for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAdoption {
    pub feature: String,
    pub adoption_rate_percent: f64,
    pub users: u64,
    pub total_users: u64,
}

/// Ingestion-consumer status inside the system-health payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerStatus {
    pub is_running: bool,
    pub events_processed: u64,
    pub events_per_minute: f64,
}

/// Backend system health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub consumer_status: ConsumerStatus,
    pub queue_depth: u64,
}

/// One bucket of a time-series response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: DateTime<Utc>,
    pub value: f64,
}

/// One day of active-user history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActiveRow {
    pub date: NaiveDate,
    pub dau: u64,
    pub new_users: u64,
    pub returning_users: u64,
}

/// Latest DAU/WAU/MAU totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveUserTotals {
    pub dau: u64,
    pub wau: u64,
    pub mau: u64,
}

impl ActiveUserTotals {
    /// Stickiness = DAU/MAU, 0 when MAU is 0
    pub fn stickiness(&self) -> f64 {
        if self.mau == 0 {
            return 0.0;
        }
        self.dau as f64 / self.mau as f64
    }
}

/// DAU/WAU/MAU response: daily history plus latest totals
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActiveUserSummary {
    #[serde(default)]
    pub dau: Vec<DailyActiveRow>,
    #[serde(default)]
    pub latest: ActiveUserTotals,
}

/// A single named business KPI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiMetric {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub trend_percent: Option<f64>,
}

/// Learning-analytics rollup for the active range
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearningAnalytics {
    pub lessons_started: u64,
    pub lessons_completed: u64,
    pub average_completion_minutes: f64,
    pub completion_rate_percent: f64,
}

/// Raw conversion-funnel payload
///
/// The service may include its own drop-off points; the presenter
/// recomputes them locally so tie-breaking stays deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunnelPayload {
    #[serde(default)]
    pub stages: Vec<StageCount>,
    #[serde(default)]
    pub dropoff_points: Vec<DropoffPoint>,
}

/// Configuration for an exported report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub report_type: String,
    pub range: TimeRange,
}

/// Handle to a generated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportHandle {
    pub download_url: String,
}

/// Cancellable handle to the push-event channel
///
/// Receives [`LiveEvent`]s as the service delivers them. `release`
/// notifies the service exactly once that the subscriber is gone;
/// dropping the handle releases it as well, so teardown can never leak
/// the server-side subscription.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: mpsc::Receiver<LiveEvent>,
    release: Option<oneshot::Sender<()>>,
}

impl EventSubscription {
    pub fn new(receiver: mpsc::Receiver<LiveEvent>, release: oneshot::Sender<()>) -> Self {
        Self {
            receiver,
            release: Some(release),
        }
    }

    /// Receive the next pushed event; `None` once the channel closes
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.receiver.recv().await
    }

    /// Release the subscription; single-shot, later calls are no-ops
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Contract with the remote analytics service
///
/// Request/response calls plus one push channel. All calls are
/// suspension points; the core assumes no timeout beyond what the
/// transport provides.
#[async_trait]
pub trait AnalyticsService: Send + Sync + 'static {
    async fn summary_metrics(&self, range: TimeRange) -> Result<SummaryMetrics>;

    async fn feature_adoption(&self) -> Result<Vec<FeatureAdoption>>;

    async fn recent_events(&self, limit: usize) -> Result<Vec<LiveEvent>>;

    async fn system_health(&self) -> Result<SystemHealth>;

    async fn time_series(
        &self,
        metric: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Vec<TimeSeriesPoint>>;

    async fn dau_wau_mau(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ActiveUserSummary>;

    async fn active_alerts(&self) -> Result<Vec<Alert>>;

    async fn business_kpis(&self, range: TimeRange) -> Result<Vec<KpiMetric>>;

    async fn conversion_funnel(&self, range: TimeRange) -> Result<FunnelPayload>;

    async fn learning_analytics(&self, range: TimeRange) -> Result<LearningAnalytics>;

    async fn retention_cohorts(&self, range: TimeRange) -> Result<Vec<CohortRow>>;

    /// Open the push channel; the returned handle must be released
    /// exactly once on teardown
    async fn subscribe_events(&self) -> Result<EventSubscription>;

    /// Fire-and-forget report generation
    async fn generate_report(&self, config: ReportConfig) -> Result<ReportHandle>;
}
