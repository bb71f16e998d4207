// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use dashmap::DashSet;
use std::collections::VecDeque;
use std::hash::Hash;
use tokio::sync::Mutex;

/// Bounded first-seen filter for feed identifiers. Insertion order is kept
/// so the oldest entry is evicted once the cap is reached; a hash replayed
/// much later counts as fresh again.
pub struct SeenCache<T> {
    entries: DashSet<T>,
    order: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> SeenCache<T>
where
    T: Copy + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashSet::new(),
            order: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Returns `true` only the first time `key` is seen.
    pub async fn insert(&self, key: T) -> bool {
        if !self.entries.insert(key) {
            return false;
        }
        let mut order = self.order.lock().await;
        order.push_back(key);
        if order.len() > self.capacity
            && let Some(oldest) = order.pop_front()
        {
            self.entries.remove(&oldest);
        }
        true
    }
}
