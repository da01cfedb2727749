use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a dashboard instance
///
/// Defaults match the main analytics view; `business_intelligence()`
/// gives the slower-cadence variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Refresh timer period in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Capacity of the bounded live-event buffer
    #[serde(default = "default_event_buffer_capacity")]
    pub event_buffer_capacity: usize,

    /// How many entries the event-type distribution is truncated to
    #[serde(default = "default_distribution_top_n")]
    pub distribution_top_n: usize,

    /// How many ranked alerts the surface shows by default
    #[serde(default = "default_alert_display_limit")]
    pub alert_display_limit: usize,

    /// Enable the push-event subscription (polling-only when false)
    #[serde(default = "default_true")]
    pub enable_live_events: bool,

    /// Capacity of the snapshot-update broadcast channel
    #[serde(default = "default_update_channel_capacity")]
    pub update_channel_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            event_buffer_capacity: default_event_buffer_capacity(),
            distribution_top_n: default_distribution_top_n(),
            alert_display_limit: default_alert_display_limit(),
            enable_live_events: default_true(),
            update_channel_capacity: default_update_channel_capacity(),
        }
    }
}

impl DashboardConfig {
    /// Configuration for the main analytics view (30 second refresh)
    pub fn analytics() -> Self {
        Self::default()
    }

    /// Configuration for the business-intelligence view (5 minute refresh)
    pub fn business_intelligence() -> Self {
        Self {
            refresh_interval_secs: 300,
            ..Self::default()
        }
    }

    /// Refresh period as a [`Duration`]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Validate settings that would break the core's invariants
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(DashboardError::configuration(
                "refresh_interval_secs must be greater than zero",
            ));
        }
        if self.event_buffer_capacity == 0 {
            return Err(DashboardError::configuration(
                "event_buffer_capacity must be greater than zero",
            ));
        }
        if self.update_channel_capacity == 0 {
            return Err(DashboardError::configuration(
                "update_channel_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}

// Helper functions for default values
fn default_refresh_interval() -> u64 {
    30
}

fn default_event_buffer_capacity() -> usize {
    50
}

fn default_distribution_top_n() -> usize {
    10
}

fn default_alert_display_limit() -> usize {
    5
}

fn default_update_channel_capacity() -> usize {
    100
}

fn default_true() -> bool {
    true
}
