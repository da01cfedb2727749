//! Real-time analytics aggregation core for operations dashboards
//!
//! pulseboard turns a live event stream and periodic metric snapshots
//! from a remote analytics service into funnels, cohort-retention
//! tables, rolling activity counters and ranked alerts, while keeping
//! several independent refresh mechanisms (interval timer, push
//! subscription, manual refresh) consistent without race conditions or
//! unbounded memory growth.
//!
//! # Architecture
//!
//! - **Snapshot store**: the single source of truth per dashboard
//!   instance; a versioned bundle replaced atomically on each
//!   successful fetch, with last-known-good preserved on failure.
//! - **Refresh coordinator**: arbitrates timer, manual and range-change
//!   triggers into at most one in-flight fetch-and-apply cycle, using a
//!   generation counter to discard superseded results.
//! - **Bounded event buffer**: fixed-capacity, newest-first feed of
//!   pushed live events with a rolling event-type distribution.
//! - **Presenters**: pure funnel/cohort/alert transformations with no
//!   I/O, total over every edge case.
//!
//! # Example
//!
//! ```no_run
//! use pulseboard::{Dashboard, DashboardConfig, TimeRange};
//! use std::sync::Arc;
//!
//! # async fn example(service: Arc<impl pulseboard::AnalyticsService>) -> pulseboard::Result<()> {
//! let dashboard = Dashboard::mount(service, DashboardConfig::analytics()).await?;
//!
//! dashboard.set_range(TimeRange::Month).await?;
//! if let Some(snapshot) = dashboard.snapshot().await {
//!     println!("total users: {}", snapshot.summary.total_users);
//! }
//!
//! dashboard.teardown().await;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod cohort;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod funnel;
pub mod service;
pub mod snapshot;
pub mod time_range;

#[cfg(test)]
pub mod test_utils;




pub use alerts::{rank_active_alerts, top_alerts, Alert, AlertSeverity, ThresholdCondition};
pub use cohort::{average_retention, retention_color_band, CohortRow, RetentionBand};
pub use config::DashboardConfig;
pub use coordinator::{
    RefreshCoordinator, RefreshOutcome, RefreshReason, RefreshResult, SnapshotUpdate,
};
pub use dashboard::Dashboard;
pub use error::{DashboardError, Result};
pub use events::{DistributionEntry, EventBuffer, LiveEvent};
pub use funnel::{compute_funnel, DropoffPoint, Funnel, FunnelStage, StageCount};
pub use service::{
    ActiveUserSummary, ActiveUserTotals, AnalyticsService, ConsumerStatus, DailyActiveRow,
    EventSubscription, FeatureAdoption, FunnelPayload, KpiMetric, LearningAnalytics, ReportConfig,
    ReportHandle, SummaryMetrics, SystemHealth, TimeSeriesPoint, TrendSet,
};
pub use snapshot::{MetricSnapshot, SnapshotStore};
pub use time_range::{Granularity, RangeSelector, RangeWindow, TimeRange};
