use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Active reporting window for a dashboard instance
///
/// Changing the range invalidates every cached snapshot; the selector
/// below guarantees that re-selecting the active range is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    Today,
    Week,
    Month,
    Quarter,
}

/// Bucket granularity for time-series queries derived from the range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hour,
    Day,
}

/// Concrete start/end boundaries for a reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Lookback duration covered by this range
    pub fn lookback(&self) -> Duration {
        match self {
            Self::Today => Duration::days(1),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
            Self::Quarter => Duration::days(90),
        }
    }

    /// Bucket granularity: hourly for today, daily otherwise
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Today => Granularity::Hour,
            _ => Granularity::Day,
        }
    }

    /// Window boundaries ending at `end`
    pub fn window_ending_at(&self, end: DateTime<Utc>) -> RangeWindow {
        RangeWindow {
            start: end - self.lookback(),
            end,
        }
    }

    /// Window boundaries ending now
    pub fn window(&self) -> RangeWindow {
        self.window_ending_at(Utc::now())
    }

    /// Display label for range pickers
    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "Last 24 hours",
            Self::Week => "Last 7 days",
            Self::Month => "Last 30 days",
            Self::Quarter => "Last 90 days",
        }
    }
}

/// Holds the active range and filters out redundant re-selection
///
/// `select` returns whether the range actually changed; the caller only
/// schedules a refresh cycle when it did, so repeated UI clicks on the
/// active range never cause a refetch.
#[derive(Debug, Clone)]
pub struct RangeSelector {
    active: TimeRange,
}

impl RangeSelector {
    pub fn new(initial: TimeRange) -> Self {
        Self { active: initial }
    }

    pub fn active(&self) -> TimeRange {
        self.active
    }

    /// Switch to `range`, returning true if this was an actual change
    pub fn select(&mut self, range: TimeRange) -> bool {
        if self.active == range {
            return false;
        }
        self.active = range;
        true
    }
}

impl Default for RangeSelector {
    fn default() -> Self {
        Self::new(TimeRange::Week)
    }
}
