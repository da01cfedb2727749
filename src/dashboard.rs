//! Dashboard instance assembly
//!
//! One [`Dashboard`] owns the complete state of a single dashboard
//! view: the snapshot store, the bounded live-event buffer, the refresh
//! coordinator, the timer task and the push-subscription pump. There is
//! no cross-instance sharing; several instances can coexist (and do, in
//! tests) without touching each other.
//!
//! # Lifecycle
//!
//! `mount` performs the initial fetch (failure here is an
//! initialization failure), seeds the live-event feed, starts the
//! refresh timer and opens the push subscription. A subscription that
//! cannot be established degrades the instance to polling-only mode
//! rather than failing the mount. `teardown` stops the timer, releases
//! the subscription exactly once and closes the store, after which any
//! still-in-flight fetch result is ignored.
//!
//! # State slices
//!
//! The snapshot store and the event buffer are independent slices
//! behind separate locks: a pushed event never waits on a snapshot
//! replacement and vice versa.

use crate::alerts::{rank_active_alerts, top_alerts, Alert};
use crate::config::DashboardConfig;
use crate::coordinator::{
    RefreshCoordinator, RefreshOutcome, RefreshReason, RefreshResult, SnapshotUpdate,
};
use crate::error::{DashboardError, Result};
use crate::events::{DistributionEntry, EventBuffer, LiveEvent};
use crate::service::{AnalyticsService, EventSubscription, ReportConfig, ReportHandle, TimeSeriesPoint};
use crate::snapshot::{MetricSnapshot, SnapshotStore};
use crate::time_range::TimeRange;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A mounted dashboard instance
pub struct Dashboard<S: AnalyticsService> {
    service: Arc<S>,
    config: DashboardConfig,
    store: Arc<SnapshotStore>,
    buffer: Arc<parking_lot::Mutex<EventBuffer>>,
    coordinator: Arc<RefreshCoordinator<S>>,
    timer_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    pump_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    pump_shutdown: watch::Sender<bool>,
    torn_down: AtomicBool,
}

impl<S: AnalyticsService> Dashboard<S> {
    /// Mount a dashboard with the default weekly reporting window
    pub async fn mount(service: Arc<S>, config: DashboardConfig) -> Result<Self> {
        Self::mount_with_range(service, config, TimeRange::Week).await
    }

    /// Mount a dashboard with an explicit initial range
    ///
    /// Runs the initial fetch cycle (a failure here is an
    /// [`DashboardError::Initialization`]), seeds the event feed from
    /// `recent_events`, starts the refresh timer, and opens the push
    /// subscription unless disabled. Subscription failure logs a
    /// warning and continues in polling-only mode.
    pub async fn mount_with_range(
        service: Arc<S>,
        config: DashboardConfig,
        initial_range: TimeRange,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(SnapshotStore::new());
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&service),
            Arc::clone(&store),
            initial_range,
            config.update_channel_capacity,
        ));

        let initial = coordinator.request_refresh(RefreshReason::Manual).await?;
        if let RefreshOutcome::Failed(message) = initial.outcome {
            return Err(DashboardError::initialization(message));
        }

        let buffer = Arc::new(parking_lot::Mutex::new(EventBuffer::new(
            config.event_buffer_capacity,
        )));
        match service.recent_events(config.event_buffer_capacity).await {
            Ok(events) => buffer.lock().replace_all(events),
            Err(err) => {
                tracing::warn!(error = %err, "could not seed recent events, starting with an empty feed");
            }
        }

        let (pump_shutdown, shutdown_rx) = watch::channel(false);
        let dashboard = Self {
            service,
            config,
            store,
            buffer,
            coordinator,
            timer_task: parking_lot::Mutex::new(None),
            pump_task: parking_lot::Mutex::new(None),
            pump_shutdown,
            torn_down: AtomicBool::new(false),
        };

        dashboard.start_timer();

        if dashboard.config.enable_live_events {
            match dashboard.service.subscribe_events().await {
                Ok(subscription) => dashboard.start_pump(subscription, shutdown_rx),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "push subscription failed, continuing in polling-only mode"
                    );
                }
            }
        }

        tracing::info!(range = ?initial_range, "dashboard mounted");
        Ok(dashboard)
    }

    /// Latest applied snapshot
    pub async fn snapshot(&self) -> Option<Arc<MetricSnapshot>> {
        self.store.snapshot().await
    }

    /// User-facing message from the last failed refresh, if any
    pub async fn error(&self) -> Option<String> {
        self.store.error().await
    }

    pub async fn is_refreshing(&self) -> bool {
        self.store.is_refreshing().await
    }

    pub async fn is_stale(&self) -> bool {
        self.store.is_stale().await
    }

    /// Active reporting window
    pub fn range(&self) -> TimeRange {
        self.coordinator.range()
    }

    /// Manually trigger a refresh cycle
    pub async fn refresh(&self) -> Result<RefreshResult> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(DashboardError::TornDown);
        }
        self.coordinator.request_refresh(RefreshReason::Manual).await
    }

    /// Switch the reporting window; `None` when the range is unchanged
    pub async fn set_range(&self, range: TimeRange) -> Result<Option<RefreshResult>> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(DashboardError::TornDown);
        }
        self.coordinator.set_range(range).await
    }

    /// Buffered live events, newest first
    pub fn live_events(&self) -> Vec<LiveEvent> {
        self.buffer.lock().to_vec()
    }

    /// Event-type distribution over the buffered events
    pub fn event_distribution(&self) -> Vec<DistributionEntry> {
        self.buffer.lock().distribution(self.config.distribution_top_n)
    }

    /// Subscribe to applied-snapshot notifications
    pub fn subscribe_updates(&self) -> broadcast::Receiver<SnapshotUpdate> {
        self.coordinator.subscribe_updates()
    }

    /// Active alerts ranked by severity, then recency
    pub async fn ranked_alerts(&self) -> Vec<Alert> {
        match self.store.snapshot().await {
            Some(snapshot) => rank_active_alerts(&snapshot.active_alerts),
            None => Vec::new(),
        }
    }

    /// Top-N ranked alerts for the default surface; the full set stays
    /// reachable through [`Dashboard::ranked_alerts`]
    pub async fn top_alerts(&self) -> Vec<Alert> {
        let ranked = self.ranked_alerts().await;
        top_alerts(&ranked, self.config.alert_display_limit).to_vec()
    }

    /// Fetch chart series for several metrics in parallel, bucketed by
    /// the active range's granularity
    pub async fn chart_series(
        &self,
        metrics: &[&str],
    ) -> Result<Vec<(String, Vec<TimeSeriesPoint>)>> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(DashboardError::TornDown);
        }
        let range = self.range();
        let window = range.window();
        let granularity = range.granularity();

        let fetches = metrics.iter().map(|metric| {
            let service = Arc::clone(&self.service);
            let metric = metric.to_string();
            async move {
                let points = service
                    .time_series(&metric, window.start, window.end, granularity)
                    .await?;
                Ok::<_, DashboardError>((metric, points))
            }
        });

        futures::future::try_join_all(fetches).await
    }

    /// Forward a report request to the service (fire-and-forget for
    /// this core; the handle is returned to the caller)
    pub async fn generate_report(&self, config: ReportConfig) -> Result<ReportHandle> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(DashboardError::TornDown);
        }
        self.service.generate_report(config).await
    }

    /// Tear the instance down
    ///
    /// Clears the refresh timer, releases the push subscription exactly
    /// once, and closes the store so any fetch result still in flight
    /// is ignored. Idempotent.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("tearing down dashboard");

        self.coordinator.close();
        self.store.close().await;

        if let Some(handle) = self.timer_task.lock().take() {
            handle.abort();
        }

        let _ = self.pump_shutdown.send(true);
        let pump = { self.pump_task.lock().take() };
        if let Some(handle) = pump {
            // The pump releases the subscription on its way out
            let _ = handle.await;
        }
    }

    fn start_timer(&self) {
        let coordinator = Arc::clone(&self.coordinator);
        let period = self.config.refresh_interval();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if coordinator.is_closed() {
                    break;
                }
                let _ = coordinator.request_refresh(RefreshReason::Timer).await;
            }
        });
        *self.timer_task.lock() = Some(handle);
    }

    fn start_pump(&self, mut subscription: EventSubscription, mut shutdown_rx: watch::Receiver<bool>) {
        let buffer = Arc::clone(&self.buffer);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = subscription.recv() => match event {
                        Some(event) => buffer.lock().push(event),
                        None => {
                            tracing::debug!("push channel closed by the service");
                            break;
                        }
                    },
                    _ = shutdown_rx.changed() => break,
                }
            }
            subscription.release();
        });
        *self.pump_task.lock() = Some(handle);
    }
}

impl<S: AnalyticsService> Drop for Dashboard<S> {
    fn drop(&mut self) {
        // Best-effort cleanup if the caller never tore down; the pump
        // task still releases the subscription when its channel closes.
        self.coordinator.close();
        if let Some(handle) = self.timer_task.lock().take() {
            handle.abort();
        }
        let _ = self.pump_shutdown.send(true);
    }
}
