// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::app::config::GlobalSettings;
use crate::domain::error::AppError;
use crate::infrastructure::network::gas::FeePolicy;
use alloy::consensus::Transaction as _;
use alloy::network::TransactionResponse;
use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::eth::Transaction;

/// Read-only snapshot of a pending transaction, fetched once per hash.
#[derive(Debug, Clone)]
pub struct ObservedTransaction {
    pub hash: B256,
    pub to: Option<Address>,
    pub value: U256,
    pub from: Address,
}

impl ObservedTransaction {
    pub fn from_rpc(tx: &Transaction) -> Self {
        Self {
            hash: tx.tx_hash(),
            to: tx.to(),
            value: tx.value(),
            from: tx.from(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingDestination,
    BelowThreshold,
    GasReserveLow,
}

/// Everything the submission path needs for one strike, minus the nonce,
/// which is allocated at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikePlan {
    pub loan_amount: U256,
    pub fee_policy: FeePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeDecision {
    Skip(SkipReason),
    Submit(StrikePlan),
}

/// Strike thresholds and sizing, frozen at boot from configuration.
#[derive(Debug, Clone)]
pub struct StrikeRules {
    pub whale_threshold_wei: U256,
    pub critical_gas_floor_wei: U256,
    /// Ascending (value breakpoint, loan size) pairs.
    pub loan_tiers: Vec<(U256, U256)>,
    pub fee_policy: FeePolicy,
}

impl StrikeRules {
    pub fn from_settings(settings: &GlobalSettings) -> Result<Self, AppError> {
        Ok(Self {
            whale_threshold_wei: settings.whale_threshold_wei()?,
            critical_gas_floor_wei: settings.critical_gas_floor_wei()?,
            loan_tiers: settings.loan_tiers_wei()?,
            fee_policy: FeePolicy::from_settings(settings)?,
        })
    }
}

/// Pure strike filter: identical inputs always produce the identical
/// decision, so redundant or out-of-order evaluation is harmless.
///
/// Both boundaries are inclusive on the submit side: a transfer exactly at
/// the whale threshold strikes, a gas balance exactly at the floor still
/// permits the strike.
pub fn evaluate(
    tx: &ObservedTransaction,
    gas_balance: U256,
    rules: &StrikeRules,
) -> StrikeDecision {
    if tx.to.is_none() {
        return StrikeDecision::Skip(SkipReason::MissingDestination);
    }
    if tx.value < rules.whale_threshold_wei {
        return StrikeDecision::Skip(SkipReason::BelowThreshold);
    }
    if gas_balance < rules.critical_gas_floor_wei {
        return StrikeDecision::Skip(SkipReason::GasReserveLow);
    }

    StrikeDecision::Submit(StrikePlan {
        loan_amount: loan_for_value(tx.value, &rules.loan_tiers),
        fee_policy: rules.fee_policy,
    })
}

/// Step function over the observed value: the largest breakpoint at or below
/// the value wins; values under every breakpoint get the baseline tier.
pub fn loan_for_value(value: U256, tiers: &[(U256, U256)]) -> U256 {
    let mut loan = tiers.first().map(|tier| tier.1).unwrap_or_default();
    for (breakpoint, tier_loan) in tiers {
        if value >= *breakpoint {
            loan = *tier_loan;
        } else {
            break;
        }
    }
    loan
}
