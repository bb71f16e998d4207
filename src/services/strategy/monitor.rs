// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use crate::infrastructure::data::abi;
use crate::infrastructure::network::nonce::NonceManager;
use crate::infrastructure::network::provider::EndpointPool;
use crate::services::strategy::stats::{BalanceCache, StrikeStats};
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Periodic state-of-the-world report, independent of feed activity. Each
/// tick recomputes the snapshot from scratch; a failed read degrades the
/// tick to a warning and the monitor lives on.
pub struct HealthMonitor {
    pool: EndpointPool,
    wallet: Address,
    contract: Address,
    nonce: NonceManager,
    balance: BalanceCache,
    stats: Arc<StrikeStats>,
    interval: Duration,
    shutdown: CancellationToken,
}

#[derive(Debug)]
struct HealthSnapshot {
    gas_balance: U256,
    contract_earnings: U256,
    current_sequence: u64,
    idle_seconds: u64,
}

impl HealthMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: EndpointPool,
        wallet: Address,
        contract: Address,
        nonce: NonceManager,
        balance: BalanceCache,
        stats: Arc<StrikeStats>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            wallet,
            contract,
            nonce,
            balance,
            stats,
            interval,
            shutdown,
        }
    }

    pub async fn run(self) -> Result<(), AppError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // boot already produced a snapshot

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: "monitor", "Shutdown requested; stopping monitor");
                    return Ok(());
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&self) {
        match self.snapshot().await {
            Ok(snapshot) => {
                self.balance.set(snapshot.gas_balance);
                tracing::info!(
                    target: "monitor",
                    gas_eth = %format_ether(snapshot.gas_balance),
                    contract_eth = %format_ether(snapshot.contract_earnings),
                    nonce = snapshot.current_sequence,
                    idle_secs = snapshot.idle_seconds,
                    earnings_usd = self.stats.earnings_usd(),
                    "Scan active"
                );
            }
            Err(e) => {
                tracing::warn!(target: "monitor", error = %e, "Degraded snapshot; retrying next tick");
            }
        }
    }

    async fn snapshot(&self) -> Result<HealthSnapshot, AppError> {
        let wallet = self.wallet;
        let gas_balance = self
            .pool
            .query("get_balance", move |provider| async move {
                provider.get_balance(wallet).await
            })
            .await?;
        let contract_earnings = abi::contract_balance(&self.pool, self.contract).await?;

        Ok(HealthSnapshot {
            gas_balance,
            contract_earnings,
            current_sequence: self.nonce.current(),
            idle_seconds: self.stats.idle_seconds(),
        })
    }
}
