//! Fixed-window request counter.

use dashmap::DashMap;
use serde::Serialize;

use crate::time::SharedClock;

/// One counting window for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowEntry {
    pub count: u32,
    pub window_start: u64,
    pub window_end: u64,
}

impl WindowEntry {
    fn open(now: u64, window_ms: u64) -> Self {
        Self {
            count: 1,
            window_start: now,
            window_end: now.saturating_add(window_ms),
        }
    }

    fn width(&self) -> u64 {
        self.window_end - self.window_start
    }
}

/// Keyed fixed-window counter.
///
/// Each key's read-modify-write happens under its DashMap shard lock, so two
/// concurrent observations of the same key never undercount.
pub struct WindowCounter {
    entries: DashMap<String, WindowEntry>,
    clock: SharedClock,
}

impl WindowCounter {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Count one action for `key` and return the window it landed in.
    pub fn observe(&self, key: &str, window_ms: u64) -> WindowEntry {
        let now = self.clock.now_ms();

        if let Some(mut entry) = self.entries.get_mut(key) {
            if now >= entry.window_end {
                *entry = WindowEntry::open(now, window_ms);
            } else {
                entry.count = entry.count.saturating_add(1);
            }
            return *entry;
        }

        *self
            .entries
            .entry(key.to_string())
            .and_modify(|entry| {
                // Another thread created the key between our lookup and insert.
                if now >= entry.window_end {
                    *entry = WindowEntry::open(now, window_ms);
                } else {
                    entry.count = entry.count.saturating_add(1);
                }
            })
            .or_insert_with(|| WindowEntry::open(now, window_ms))
    }

    /// Observe and report whether the key is still within `max_attempts`.
    pub fn check_allowed(&self, key: &str, max_attempts: u32, window_ms: u64) -> bool {
        self.observe(key, window_ms).count <= max_attempts
    }

    /// Current window for a key without counting anything.
    pub fn peek(&self, key: &str) -> Option<WindowEntry> {
        self.entries.get(key).map(|r| *r.value())
    }

    /// Drop entries whose window ended more than one window width ago.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.window_end.saturating_add(entry.width()));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
