// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, address};

// =============================================================================
// NETWORK CONSTANTS
// =============================================================================

pub const CHAIN_BASE: u64 = 8453;

// Base "long tail" strike assets
pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
pub const DEGEN_BASE: Address = address!("4edbc9ba171790664872997239bc7a3f3a633190");
pub const VIRTUAL_BASE: Address = address!("0b3e328455822223971382430b04e370d2367831");

// Deployed flash-arbitrage executor
pub const APEX_EXECUTOR: Address = address!("83EF5c401fAa5B9674BAfAcFb089b30bAc67C9A0");

// =============================================================================
// GAS & TRANSACTION CONSTANTS
// =============================================================================

pub const STRIKE_GAS_LIMIT: u64 = 850_000;
pub const WITHDRAW_GAS_LIMIT: u64 = 120_000;
pub const DEFAULT_PRIORITY_FEE_GWEI: u64 = 2;
pub const GWEI: u128 = 1_000_000_000;

// =============================================================================
// STRATEGY DEFAULTS
// =============================================================================

/// Flat per-confirmed-strike earnings estimate reported on /status (USD).
pub const ESTIMATED_PROFIT_PER_STRIKE_USD_CENTS: u64 = 1_250;

pub const DEFAULT_WHALE_THRESHOLD_ETH: &str = "0.05";
pub const DEFAULT_CRITICAL_GAS_FLOOR_ETH: &str = "0.01";

// =============================================================================
// LOGGING DEFAULTS
// =============================================================================

pub const DEFAULT_LOG_LEVEL: &str = "info";
