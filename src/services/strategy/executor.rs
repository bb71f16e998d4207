// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::app::config::GlobalSettings;
use crate::common::constants::{ESTIMATED_PROFIT_PER_STRIKE_USD_CENTS, WITHDRAW_GAS_LIMIT};
use crate::domain::error::AppError;
use crate::infrastructure::data::abi;
use crate::infrastructure::network::gas::{GasOracle, GasPricing};
use crate::infrastructure::network::nonce::NonceManager;
use crate::infrastructure::network::provider::EndpointPool;
use crate::services::strategy::decision::{
    self, ObservedTransaction, StrikeDecision, StrikePlan, StrikeRules,
};
use crate::services::strategy::stats::{BalanceCache, StrikeStats};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::eips::eip2930::AccessList;
use alloy::network::TxSignerSync;
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, B256, TxKind, U256};
use alloy::providers::Provider;
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::sleep;

/// Builds and races strike transactions. Sends are fire-and-forget: the
/// caller gets control back as soon as the raw transaction is accepted by an
/// endpoint, and a detached watcher observes the outcome. The hot path never
/// stops for a failed attempt.
pub struct StrikeExecutor {
    pool: EndpointPool,
    nonce: NonceManager,
    gas_oracle: GasOracle,
    signer: PrivateKeySigner,
    chain_id: u64,
    contract: Address,
    token_in: Address,
    token_out: Address,
    gas_limit: u64,
    rules: StrikeRules,
    balance: BalanceCache,
    stats: Arc<StrikeStats>,
    dry_run: bool,
    receipt_poll: Duration,
    receipt_timeout: Duration,
}

impl StrikeExecutor {
    pub fn new(
        settings: &GlobalSettings,
        pool: EndpointPool,
        nonce: NonceManager,
        gas_oracle: GasOracle,
        signer: PrivateKeySigner,
        balance: BalanceCache,
        stats: Arc<StrikeStats>,
        dry_run: bool,
    ) -> Result<Self, AppError> {
        Ok(Self {
            pool,
            nonce,
            gas_oracle,
            signer,
            chain_id: settings.chain_id,
            contract: settings.contract_address,
            token_in: settings.strike_token_in(),
            token_out: settings.strike_token_out(),
            gas_limit: settings.strike_gas_limit,
            rules: StrikeRules::from_settings(settings)?,
            balance,
            stats,
            dry_run,
            receipt_poll: settings.receipt_poll(),
            receipt_timeout: settings.receipt_timeout(),
        })
    }

    pub fn wallet_address(&self) -> Address {
        self.signer.address()
    }

    pub async fn wallet_balance(&self) -> Result<U256, AppError> {
        let wallet = self.signer.address();
        self.pool
            .query("get_balance", move |provider| async move {
                provider.get_balance(wallet).await
            })
            .await
    }

    pub async fn contract_earnings(&self) -> Result<U256, AppError> {
        abi::contract_balance(&self.pool, self.contract).await
    }

    /// Entry point for every identifier coming off the pending feed.
    /// All failures are contained here; the feed loop never sees them.
    pub async fn handle_pending(self: Arc<Self>, hash: B256) {
        let observed = match self.fetch_observed(hash).await {
            Ok(Some(observed)) => observed,
            Ok(None) => return, // not yet visible to our endpoints
            Err(e) => {
                tracing::debug!(target: "executor", tx = %hash, error = %e, "Pending tx fetch failed");
                return;
            }
        };

        self.stats.processed.fetch_add(1, Ordering::Relaxed);
        match decision::evaluate(&observed, self.balance.get(), &self.rules) {
            StrikeDecision::Skip(reason) => {
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(target: "executor", tx = %hash, ?reason, "Skip");
            }
            StrikeDecision::Submit(plan) => {
                self.stats.note_whale();
                tracing::info!(
                    target: "executor",
                    tx = %hash,
                    value_eth = %format_ether(observed.value),
                    loan = %format_ether(plan.loan_amount),
                    "Whale targeted"
                );
                match self.strike(plan).await {
                    Ok(Some(sent)) => {
                        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(target: "executor", tx = %sent, "Strike sent");
                        let this = self.clone();
                        tokio::spawn(async move { this.watch_confirmation(sent).await });
                    }
                    Ok(None) => {
                        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(target: "executor", tx = %hash, error = %e, "Strike failed");
                    }
                }
            }
        }
    }

    async fn fetch_observed(&self, hash: B256) -> Result<Option<ObservedTransaction>, AppError> {
        let tx = self
            .pool
            .query("get_transaction", move |provider| async move {
                provider.get_transaction_by_hash(hash).await
            })
            .await?;
        Ok(tx.as_ref().map(ObservedTransaction::from_rpc))
    }

    /// Price, sign and send one strike. Returns the sent hash, or `None` in
    /// dry-run mode. A sequence conflict resyncs the nonce and drops the
    /// attempt; the next observed whale gets a fresh allocation.
    async fn strike(&self, plan: StrikePlan) -> Result<Option<B256>, AppError> {
        let observed_fees = self.gas_oracle.observe().await?;
        let pricing = GasPricing::for_policy(plan.fee_policy, &observed_fees);
        let nonce = self.nonce.allocate();
        let calldata = abi::strike_calldata(self.token_in, self.token_out, plan.loan_amount);
        let (raw, tx_hash) =
            self.sign_call(self.contract, self.gas_limit, pricing, nonce, calldata)?;

        if self.dry_run {
            tracing::info!(
                target: "executor",
                tx = %tx_hash,
                nonce,
                priority_fee = pricing.max_priority_fee_per_gas,
                "Dry-run: would send strike"
            );
            return Ok(None);
        }

        match self.send_raw(raw).await {
            Ok(sent) => Ok(Some(sent)),
            Err(e) if e.is_sequence_conflict() => {
                tracing::warn!(target: "executor", nonce, error = %e, "Sequence conflict; resyncing");
                if let Err(re) = self.nonce.resync().await {
                    tracing::warn!(target: "executor", error = %re, "Nonce resync failed");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn sign_call(
        &self,
        to: Address,
        gas_limit: u64,
        pricing: GasPricing,
        nonce: u64,
        calldata: Vec<u8>,
    ) -> Result<(Vec<u8>, B256), AppError> {
        let mut tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas: pricing.max_fee_per_gas,
            max_priority_fee_per_gas: pricing.max_priority_fee_per_gas,
            to: TxKind::Call(to),
            value: U256::ZERO,
            access_list: AccessList::default(),
            input: calldata.into(),
        };

        let sig = TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
            .map_err(|e| AppError::Strategy(format!("Sign tx failed: {}", e)))?;
        let signed: TxEnvelope = tx.into_signed(sig).into();
        Ok((signed.encoded_2718(), *signed.tx_hash()))
    }

    async fn send_raw(&self, raw: Vec<u8>) -> Result<B256, AppError> {
        self.pool
            .query("send_raw_transaction", |provider| {
                let raw = raw.clone();
                async move {
                    provider
                        .send_raw_transaction(&raw)
                        .await
                        .map(|pending| *pending.tx_hash())
                }
            })
            .await
    }

    /// Best-effort outcome observation. Logs only; a send-time conflict is
    /// the sole signal that triggers a resync, never anything seen here.
    async fn watch_confirmation(&self, hash: B256) {
        let deadline = tokio::time::Instant::now() + self.receipt_timeout;
        loop {
            match self
                .pool
                .query("get_transaction_receipt", move |provider| async move {
                    provider.get_transaction_receipt(hash).await
                })
                .await
            {
                Ok(Some(receipt)) => {
                    if receipt.status() {
                        self.stats.confirmed.fetch_add(1, Ordering::Relaxed);
                        self.stats
                            .add_earnings_cents(ESTIMATED_PROFIT_PER_STRIKE_USD_CENTS);
                        tracing::info!(
                            target: "executor",
                            tx = %hash,
                            block = receipt.block_number,
                            "Strike mined"
                        );
                    } else {
                        self.stats.reverted.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            target: "executor",
                            tx = %hash,
                            block = receipt.block_number,
                            "Strike reverted on-chain"
                        );
                    }
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(target: "executor", tx = %hash, error = %e, "Receipt poll failed");
                }
            }

            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(target: "executor", tx = %hash, "Confirmation not observed before timeout");
                return;
            }
            sleep(self.receipt_poll).await;
        }
    }

    /// Operator-initiated sweep of contract earnings. Unlike strikes this
    /// waits for the receipt so the control surface can answer definitively.
    pub async fn withdraw(&self) -> Result<(B256, bool), AppError> {
        if self.dry_run {
            return Err(AppError::Strategy("Dry-run: withdraw disabled".into()));
        }

        let observed_fees = self.gas_oracle.observe().await?;
        let pricing = GasPricing::for_policy(self.rules.fee_policy, &observed_fees);
        let nonce = self.nonce.allocate();
        let (raw, _) = self.sign_call(
            self.contract,
            WITHDRAW_GAS_LIMIT,
            pricing,
            nonce,
            abi::withdraw_calldata(),
        )?;

        let hash = match self.send_raw(raw).await {
            Ok(hash) => hash,
            Err(e) => {
                if e.is_sequence_conflict() {
                    tracing::warn!(target: "executor", nonce, error = %e, "Withdraw hit sequence conflict; resyncing");
                    if let Err(re) = self.nonce.resync().await {
                        tracing::warn!(target: "executor", error = %re, "Nonce resync failed");
                    }
                }
                return Err(e);
            }
        };

        tracing::info!(target: "executor", tx = %hash, "Withdraw submitted");
        let status = self.await_receipt(hash).await?;
        Ok((hash, status))
    }

    async fn await_receipt(&self, hash: B256) -> Result<bool, AppError> {
        let deadline = tokio::time::Instant::now() + self.receipt_timeout;
        loop {
            if let Ok(Some(receipt)) = self
                .pool
                .query("get_transaction_receipt", move |provider| async move {
                    provider.get_transaction_receipt(hash).await
                })
                .await
            {
                return Ok(receipt.status());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::Transaction {
                    hash: format!("{:#x}", hash),
                    reason: "confirmation not observed before timeout".into(),
                });
            }
            sleep(self.receipt_poll).await;
        }
    }
}
