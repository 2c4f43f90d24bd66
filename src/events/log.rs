//! Bounded, time-ordered event log.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use uuid::Uuid;

use crate::events::types::{EventKind, SecurityEvent, Severity};
use crate::time::SharedClock;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Aggregate counts over a time range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub total_count: usize,
    pub counts_by_type: BTreeMap<EventKind, usize>,
    pub counts_by_severity: BTreeMap<Severity, usize>,
}

/// Append-only ring buffer of security events.
pub struct EventLog {
    events: Mutex<VecDeque<SecurityEvent>>,
    capacity: usize,
    clock: SharedClock,
}

impl EventLog {
    pub fn new(capacity: usize, clock: SharedClock) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            clock,
        }
    }

    /// Append an event, dropping the oldest once full.
    pub fn record(&self, event: SecurityEvent) -> Uuid {
        let id = event.id;
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        id
    }

    /// Up to `limit` events, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<SecurityEvent> {
        let events = self.events.lock();
        events.iter().rev().take(limit).cloned().collect()
    }

    pub fn get(&self, id: Uuid) -> Option<SecurityEvent> {
        self.events.lock().iter().find(|e| e.id == id).cloned()
    }

    /// Counts of events that occurred within the last `window`.
    pub fn stats_since(&self, window: Duration) -> EventStats {
        let cutoff = self
            .clock
            .now_ms()
            .saturating_sub(window.as_millis() as u64);

        let events = self.events.lock();
        let mut stats = EventStats::default();
        for event in events.iter().filter(|e| e.occurred_at >= cutoff) {
            stats.total_count += 1;
            *stats.counts_by_type.entry(event.kind).or_default() += 1;
            *stats.counts_by_severity.entry(event.severity).or_default() += 1;
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
