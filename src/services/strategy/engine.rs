// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::app::config::GlobalSettings;
use crate::domain::error::AppError;
use crate::infrastructure::network::gas::GasOracle;
use crate::infrastructure::network::ingest::mempool::MempoolScanner;
use crate::infrastructure::network::nonce::NonceManager;
use crate::infrastructure::network::provider::EndpointPool;
use crate::services::api::{self, ControlContext};
use crate::services::strategy::executor::StrikeExecutor;
use crate::services::strategy::monitor::HealthMonitor;
use crate::services::strategy::stats::{BalanceCache, StrikeStats};
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, B256};
use alloy::providers::Provider;
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The one context object owning every component; nothing here is ambient.
pub struct Engine {
    pool: EndpointPool,
    nonce: NonceManager,
    balance: BalanceCache,
    stats: Arc<StrikeStats>,
    executor: Arc<StrikeExecutor>,
    ws_endpoint: String,
    feed_backoff: Duration,
    keepalive_interval: Duration,
    monitor_interval: Duration,
    api_port: u16,
    contract: Address,
    wallet: Address,
}

impl Engine {
    pub fn new(
        settings: &GlobalSettings,
        signer: PrivateKeySigner,
        dry_run: bool,
    ) -> Result<Self, AppError> {
        let pool = EndpointPool::from_settings(&settings.rpc_endpoints)?;
        let wallet = signer.address();
        let nonce = NonceManager::new(pool.clone(), wallet);
        let gas_oracle = GasOracle::new(pool.clone());
        let balance = BalanceCache::default();
        let stats = Arc::new(StrikeStats::default());
        let executor = Arc::new(StrikeExecutor::new(
            settings,
            pool.clone(),
            nonce.clone(),
            gas_oracle,
            signer,
            balance.clone(),
            stats.clone(),
            dry_run,
        )?);

        Ok(Self {
            pool,
            nonce,
            balance,
            stats,
            executor,
            ws_endpoint: settings.ws_endpoint.clone(),
            feed_backoff: settings.feed_backoff(),
            keepalive_interval: settings.keepalive_interval(),
            monitor_interval: settings.monitor_interval(),
            api_port: settings.api_port,
            contract: settings.contract_address,
            wallet,
        })
    }

    pub async fn run(self) -> Result<(), AppError> {
        // Hardened boot: this is the single fatal path. Without a reachable
        // endpoint there is no safe nonce or balance to assume.
        let start_nonce = self
            .nonce
            .resync()
            .await
            .map_err(|e| AppError::Initialization(format!("Boot nonce sync failed: {}", e)))?;
        let wallet = self.wallet;
        let boot_balance = self
            .pool
            .query("get_balance", move |provider| async move {
                provider.get_balance(wallet).await
            })
            .await
            .map_err(|e| AppError::Initialization(format!("Boot balance read failed: {}", e)))?;
        self.balance.set(boot_balance);
        tracing::info!(
            target: "engine",
            nonce = start_nonce,
            balance_eth = %format_ether(boot_balance),
            "Apex engine live"
        );

        let shutdown = CancellationToken::new();
        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!(target: "engine", "Ctrl-C received; shutting down");
                    shutdown.cancel();
                }
            });
        }

        api::spawn_control_server(
            self.api_port,
            ControlContext {
                executor: self.executor.clone(),
                stats: self.stats.clone(),
            },
        )
        .await;

        let monitor = HealthMonitor::new(
            self.pool.clone(),
            self.wallet,
            self.contract,
            self.nonce.clone(),
            self.balance.clone(),
            self.stats.clone(),
            self.monitor_interval,
            shutdown.clone(),
        );

        let (hash_tx, hash_rx) = mpsc::unbounded_channel();
        let scanner = MempoolScanner::new(
            self.ws_endpoint.clone(),
            hash_tx,
            self.feed_backoff,
            self.keepalive_interval,
            shutdown.clone(),
        );

        tokio::try_join!(
            scanner.run(),
            monitor.run(),
            self.drain_feed(hash_rx, shutdown),
        )
        .map(|_| ())?;

        tracing::info!(target: "engine", "Engine stopped");
        Ok(())
    }

    /// One detached strike task per identifier; nothing blocks here.
    async fn drain_feed(
        &self,
        mut hash_rx: mpsc::UnboundedReceiver<B256>,
        shutdown: CancellationToken,
    ) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                maybe_hash = hash_rx.recv() => match maybe_hash {
                    Some(hash) => {
                        let executor = self.executor.clone();
                        tokio::spawn(async move { executor.handle_pending(hash).await });
                    }
                    None => return Ok(()),
                },
            }
        }
    }
}
