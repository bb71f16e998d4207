// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::error::AppError;
use crate::common::retry::retry_async;
use crate::infrastructure::network::provider::EndpointPool;
use alloy::primitives::Address;
use alloy::providers::Provider;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Owns the next outgoing nonce for the signing wallet.
///
/// Allocation is optimistic and purely local: a single atomic fetch-add, never
/// a network round trip, so burst dispatch can hand out consecutive nonces
/// faster than the chain confirms them. Some of those in-flight submissions
/// may be rejected; the send path calls `resync` on a nonce-conflict signal
/// and the pending-inclusive chain view becomes authoritative again.
#[derive(Clone)]
pub struct NonceManager {
    pool: EndpointPool,
    address: Address,
    next: Arc<AtomicU64>,
}

impl NonceManager {
    pub fn new(pool: EndpointPool, address: Address) -> Self {
        Self {
            pool,
            address,
            next: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Hand out the current nonce and advance the local counter.
    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Peek without allocating.
    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Replace the local counter with the pending-inclusive on-chain count.
    pub async fn resync(&self) -> Result<u64, AppError> {
        let address = self.address;
        let on_chain_nonce: u64 = retry_async(
            "get_transaction_count",
            3,
            Duration::from_millis(100),
            |_| {
                let pool = self.pool.clone();
                async move {
                    pool.query("get_transaction_count", move |provider| async move {
                        provider.get_transaction_count(address).pending().await
                    })
                    .await
                }
            },
        )
        .await?;

        self.next.store(on_chain_nonce, Ordering::SeqCst);
        tracing::debug!(target: "nonce", nonce = on_chain_nonce, "Nonce resynced");
        Ok(on_chain_nonce)
    }
}
