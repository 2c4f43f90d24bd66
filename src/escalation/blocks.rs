//! Active blocks keyed by target.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use crate::time::SharedClock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub target_key: String,
    pub reason: String,
    pub created_at: u64,
    pub expires_at: u64,
}

impl Block {
    pub fn is_active(&self, now: u64) -> bool {
        now <= self.expires_at
    }
}

/// At most one block per target key; expiry is checked on read.
pub struct BlockList {
    blocks: DashMap<String, Block>,
    clock: SharedClock,
}

impl BlockList {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            blocks: DashMap::new(),
            clock,
        }
    }

    /// The active block for a key, if any.
    pub fn active(&self, target_key: &str) -> Option<Block> {
        let now = self.clock.now_ms();
        self.blocks
            .get(target_key)
            .filter(|b| b.is_active(now))
            .map(|b| b.value().clone())
    }

    pub fn is_blocked(&self, target_key: &str) -> bool {
        self.active(target_key).is_some()
    }

    /// Block `target_key` for `duration_ms`.
    ///
    /// Returns the new block, or `None` when an active block already stands.
    pub fn insert(&self, target_key: &str, reason: &str, duration_ms: u64) -> Option<Block> {
        let now = self.clock.now_ms();
        let block = Block {
            target_key: target_key.to_string(),
            reason: reason.to_string(),
            created_at: now,
            expires_at: now.saturating_add(duration_ms),
        };

        match self.blocks.entry(target_key.to_string()) {
            Entry::Occupied(mut existing) => {
                if existing.get().is_active(now) {
                    return None;
                }
                existing.insert(block.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(block.clone());
            }
        }
        Some(block)
    }

    /// Lift a block early. Returns whether an active block was removed.
    pub fn remove(&self, target_key: &str) -> bool {
        let now = self.clock.now_ms();
        self.blocks
            .remove(target_key)
            .is_some_and(|(_, b)| b.is_active(now))
    }

    /// All blocks still in force.
    pub fn list(&self) -> Vec<Block> {
        let now = self.clock.now_ms();
        let mut blocks: Vec<Block> = self
            .blocks
            .iter()
            .filter(|r| r.is_active(now))
            .map(|r| r.value().clone())
            .collect();
        blocks.sort_by_key(|b| b.expires_at);
        blocks
    }

    /// Remove expired blocks. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.blocks.len();
        self.blocks.retain(|_, b| b.is_active(now));
        before.saturating_sub(self.blocks.len())
    }
}
