// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use alloy::primitives::U256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Hot-path counters shared by the executor, monitor and control surface.
#[derive(Default)]
pub struct StrikeStats {
    pub processed: AtomicU64,
    pub skipped: AtomicU64,
    pub submitted: AtomicU64,
    pub confirmed: AtomicU64,
    pub reverted: AtomicU64,
    pub failed: AtomicU64,
    earnings_usd_cents: AtomicU64,
    last_whale_unix: AtomicU64,
}

impl StrikeStats {
    pub fn note_whale(&self) {
        self.last_whale_unix.store(current_unix(), Ordering::Relaxed);
    }

    /// Seconds since the last whale sighting; zero until the first one.
    pub fn idle_seconds(&self) -> u64 {
        let last = self.last_whale_unix.load(Ordering::Relaxed);
        if last == 0 {
            return 0;
        }
        current_unix().saturating_sub(last)
    }

    pub fn add_earnings_cents(&self, cents: u64) {
        self.earnings_usd_cents.fetch_add(cents, Ordering::Relaxed);
    }

    pub fn earnings_usd(&self) -> f64 {
        self.earnings_usd_cents.load(Ordering::Relaxed) as f64 / 100.0
    }
}

/// Last gas balance observed for the signing wallet. Refreshed at boot and on
/// every monitor tick so the strike decision never blocks on a balance read.
#[derive(Clone, Default)]
pub struct BalanceCache(Arc<Mutex<U256>>);

impl BalanceCache {
    pub fn get(&self) -> U256 {
        self.0.lock().map(|guard| *guard).unwrap_or_default()
    }

    pub fn set(&self, balance: U256) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = balance;
        }
    }
}

fn current_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_is_zero_before_first_whale() {
        let stats = StrikeStats::default();
        assert_eq!(stats.idle_seconds(), 0);
        stats.note_whale();
        assert!(stats.idle_seconds() <= 1);
    }

    #[test]
    fn earnings_accumulate_in_cents() {
        let stats = StrikeStats::default();
        stats.add_earnings_cents(1_250);
        stats.add_earnings_cents(1_250);
        assert_eq!(stats.earnings_usd(), 25.0);
    }

    #[test]
    fn balance_cache_roundtrips() {
        let cache = BalanceCache::default();
        assert_eq!(cache.get(), U256::ZERO);
        cache.set(U256::from(7u64));
        assert_eq!(cache.get(), U256::from(7u64));
    }
}
