//! Bounded live-event buffer
//!
//! Fixed-capacity, newest-first sequence of incoming live events with a
//! rolling event-type distribution. Pushes are O(1) amortized; once
//! capacity is exceeded the oldest entry is dropped silently. The
//! distribution is recomputed from the current contents on every call,
//! never cached across pushes.
//!
//! The buffer is a state slice independent of the snapshot store: the
//! dashboard guards it with its own lock so a push can never contend
//! with a snapshot replacement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// A single event delivered over the push channel
///
/// Immutable once received. Duplicate delivery by the transport is
/// accepted as-is; the buffer applies events in arrival order with no
/// deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub subject_id: Option<String>,
    pub associated_entity_id: Option<String>,
}

impl LiveEvent {
    pub fn new<S: Into<String>>(event_type: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            occurred_at: Utc::now(),
            subject_id: None,
            associated_entity_id: None,
        }
    }
}

/// One row of the rolling event-type distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub event_type: String,
    pub count: usize,
    /// Share of all currently buffered events, in percent
    pub share_percent: f64,
}

/// Fixed-capacity, most-recent-first event sequence
///
/// Invariant: `len() <= capacity()` at all times.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    events: VecDeque<LiveEvent>,
    capacity: usize,
}

impl EventBuffer {
    /// Create a buffer holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend an event, evicting the oldest once over capacity
    pub fn push(&mut self, event: LiveEvent) {
        self.events.push_front(event);
        if self.events.len() > self.capacity {
            self.events.pop_back();
        }
    }

    /// Replace the contents with `events` (newest first), applying the
    /// same capacity bound. Used to seed the feed at mount time.
    pub fn replace_all<I: IntoIterator<Item = LiveEvent>>(&mut self, events: I) {
        self.events.clear();
        for event in events.into_iter().take(self.capacity) {
            self.events.push_back(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events in display order, newest first
    pub fn iter(&self) -> impl Iterator<Item = &LiveEvent> {
        self.events.iter()
    }

    /// Snapshot of the current contents, newest first
    pub fn to_vec(&self) -> Vec<LiveEvent> {
        self.events.iter().cloned().collect()
    }

    /// Event-type distribution over the current contents only
    ///
    /// Sorted by count descending, ties by event type ascending so the
    /// truncation to `top_n` is deterministic.
    pub fn distribution(&self, top_n: usize) -> Vec<DistributionEntry> {
        let total = self.events.len();
        if total == 0 {
            return Vec::new();
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for event in &self.events {
            *counts.entry(event.event_type.as_str()).or_insert(0) += 1;
        }

        let mut entries: Vec<DistributionEntry> = counts
            .into_iter()
            .map(|(event_type, count)| DistributionEntry {
                event_type: event_type.to_string(),
                count,
                share_percent: count as f64 / total as f64 * 100.0,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.event_type.cmp(&b.event_type))
        });
        entries.truncate(top_n);
        entries
    }
}
