// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::app::config::GlobalSettings;
use crate::common::constants::GWEI;
use crate::common::error::AppError;
use crate::infrastructure::network::provider::EndpointPool;
use alloy::providers::Provider;
use alloy::rpc::types::BlockNumberOrTag;
use alloy::rpc::types::eth::FeeHistory;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct GasOracle {
    pool: EndpointPool,
    last_good: Arc<Mutex<Option<GasFees>>>,
}

/// Network-observed fee levels for the next block.
#[derive(Debug, Clone)]
pub struct GasFees {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub next_base_fee_per_gas: u128,
}

/// Bid parameters attached to a single strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPricing {
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
}

/// How strike bids are priced relative to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    /// Scale the observed priority fee to jump the queue.
    Aggressive { multiplier: u64 },
    /// Fixed configured floors, ignoring observed levels.
    Static {
        priority_fee_per_gas: u128,
        max_fee_per_gas: u128,
    },
}

impl FeePolicy {
    pub fn from_settings(settings: &GlobalSettings) -> Result<Self, AppError> {
        match settings.fee_policy.trim().to_ascii_lowercase().as_str() {
            "aggressive" => Ok(FeePolicy::Aggressive {
                multiplier: settings.priority_fee_multiplier.max(1),
            }),
            "static" => Ok(FeePolicy::Static {
                priority_fee_per_gas: settings.static_priority_fee_gwei as u128 * GWEI,
                max_fee_per_gas: settings.static_max_fee_gwei as u128 * GWEI,
            }),
            other => Err(AppError::Config(format!(
                "Unknown fee_policy '{}' (expected 'aggressive' or 'static')",
                other
            ))),
        }
    }
}

impl GasPricing {
    /// Resolve concrete bid parameters from the policy and observed levels.
    /// The priority fee never exceeds the max fee.
    pub fn for_policy(policy: FeePolicy, observed: &GasFees) -> Self {
        let (priority, max_fee) = match policy {
            FeePolicy::Aggressive { multiplier } => {
                let priority = observed
                    .max_priority_fee_per_gas
                    .saturating_mul(multiplier as u128);
                let max_fee = observed
                    .max_fee_per_gas
                    .max(observed.next_base_fee_per_gas.saturating_add(priority));
                (priority, max_fee)
            }
            FeePolicy::Static {
                priority_fee_per_gas,
                max_fee_per_gas,
            } => (priority_fee_per_gas, max_fee_per_gas),
        };

        Self {
            max_priority_fee_per_gas: priority.min(max_fee),
            max_fee_per_gas: max_fee,
        }
    }
}

impl GasOracle {
    pub fn new(pool: EndpointPool) -> Self {
        Self {
            pool,
            last_good: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn observe(&self) -> Result<GasFees, AppError> {
        match self.fee_history().await {
            Ok(history) => {
                let fees = Self::fees_from_history(history)?;
                if let Ok(mut guard) = self.last_good.lock() {
                    *guard = Some(fees.clone());
                }
                Ok(fees)
            }
            Err(_) => {
                if let Ok(guard) = self.last_good.lock()
                    && let Some(fees) = guard.clone()
                {
                    return Ok(fees);
                }
                self.fallback_estimate().await
            }
        }
    }
}

impl GasOracle {
    async fn fee_history(&self) -> Result<FeeHistory, AppError> {
        self.pool
            .query("fee_history", |provider| async move {
                provider
                    .get_fee_history(5, BlockNumberOrTag::Latest, &[50.0f64])
                    .await
            })
            .await
    }

    fn fees_from_history(history: FeeHistory) -> Result<GasFees, AppError> {
        let latest_base_fee = history
            .latest_block_base_fee()
            .or_else(|| history.base_fee_per_gas.iter().rev().nth(1).copied())
            .ok_or(AppError::Initialization("No base fee history".into()))?;

        let raw_next_base = history.next_block_base_fee().unwrap_or(latest_base_fee);

        // 12.5% buffer for nodes that return zeroes.
        let next_base_fee = if raw_next_base == 0 {
            (latest_base_fee.saturating_mul(1125)) / 1000
        } else {
            raw_next_base
        };

        let mut p50_sum = 0u128;
        let mut p50_count = 0u128;
        if let Some(rewards) = &history.reward {
            for block_reward in rewards {
                if let Some(r) = block_reward.first() {
                    p50_sum = p50_sum.saturating_add(*r);
                    p50_count = p50_count.saturating_add(1);
                }
            }
        }

        let avg_p50 = if p50_count > 0 {
            p50_sum / p50_count
        } else {
            2_000_000_000
        };

        Ok(GasFees {
            max_fee_per_gas: next_base_fee.saturating_add(avg_p50),
            max_priority_fee_per_gas: avg_p50,
            next_base_fee_per_gas: next_base_fee,
        })
    }

    // Fallback path for nodes that disable feeHistory (common on public RPCs).
    async fn fallback_estimate(&self) -> Result<GasFees, AppError> {
        let block = self
            .pool
            .query("latest_block", |provider| async move {
                provider.get_block_by_number(BlockNumberOrTag::Latest).await
            })
            .await?;

        let base: u128 = block
            .as_ref()
            .and_then(|b| b.header.base_fee_per_gas)
            .map(|v| v as u128)
            .unwrap_or(1_500_000_000u128); // 1.5 gwei conservative default

        let priority: u128 = self
            .pool
            .query("max_priority_fee", |provider| async move {
                provider.get_max_priority_fee_per_gas().await
            })
            .await
            .unwrap_or(2_000_000_000u128); // 2 gwei floor

        let next_base = (base.saturating_mul(1125)) / 1000;

        Ok(GasFees {
            max_fee_per_gas: next_base + priority,
            max_priority_fee_per_gas: priority,
            next_base_fee_per_gas: next_base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed() -> GasFees {
        GasFees {
            max_fee_per_gas: 30 * GWEI,
            max_priority_fee_per_gas: 2 * GWEI,
            next_base_fee_per_gas: 28 * GWEI,
        }
    }

    #[test]
    fn aggressive_policy_scales_priority_fee() {
        let pricing = GasPricing::for_policy(FeePolicy::Aggressive { multiplier: 2 }, &observed());
        assert_eq!(pricing.max_priority_fee_per_gas, 4 * GWEI);
        // Max fee absorbs the boosted bribe on top of the next base fee.
        assert_eq!(pricing.max_fee_per_gas, 32 * GWEI);
        assert!(pricing.max_priority_fee_per_gas <= pricing.max_fee_per_gas);
    }

    #[test]
    fn static_policy_ignores_observed_levels() {
        let policy = FeePolicy::Static {
            priority_fee_per_gas: 3 * GWEI,
            max_fee_per_gas: 40 * GWEI,
        };
        let pricing = GasPricing::for_policy(policy, &observed());
        assert_eq!(pricing.max_priority_fee_per_gas, 3 * GWEI);
        assert_eq!(pricing.max_fee_per_gas, 40 * GWEI);
    }

    #[test]
    fn priority_fee_clamped_to_max_fee() {
        let policy = FeePolicy::Static {
            priority_fee_per_gas: 50 * GWEI,
            max_fee_per_gas: 10 * GWEI,
        };
        let pricing = GasPricing::for_policy(policy, &observed());
        assert_eq!(pricing.max_priority_fee_per_gas, 10 * GWEI);
    }

    #[test]
    fn history_with_zero_next_base_gets_buffered() {
        let history = FeeHistory {
            base_fee_per_gas: vec![1_000_000_000, 0],
            gas_used_ratio: vec![0.5],
            oldest_block: 1,
            reward: Some(vec![vec![1_000_000_000]]),
            ..Default::default()
        };
        let fees = GasOracle::fees_from_history(history).unwrap();
        assert_eq!(fees.next_base_fee_per_gas, 1_125_000_000);
        assert_eq!(fees.max_priority_fee_per_gas, 1_000_000_000);
    }
}
