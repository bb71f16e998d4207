// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants;
use crate::domain::error::AppError;
use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, U256};
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalSettings {
    // General
    #[serde(default = "default_debug")]
    pub debug: bool,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_false")]
    pub dry_run: bool,

    // Identity
    pub wallet_key: String,
    #[serde(default = "default_contract_address")]
    pub contract_address: Address,

    // Connectivity
    #[serde(default, deserialize_with = "deserialize_endpoint_list")]
    pub rpc_endpoints: Vec<EndpointSettings>,
    pub ws_endpoint: String,

    // Strike thresholds (decimal ether strings, parsed to wei on access)
    #[serde(default = "default_whale_threshold")]
    pub whale_threshold_eth: String,
    #[serde(default = "default_critical_gas_floor")]
    pub critical_gas_floor_eth: String,
    #[serde(default = "default_loan_tiers")]
    pub loan_tiers: Vec<LoanTierSettings>,

    // Strike assets
    pub token_in: Option<Address>,
    pub token_out: Option<Address>,
    #[serde(default = "default_strike_gas_limit")]
    pub strike_gas_limit: u64,

    // Fee policy: "aggressive" scales observed fees, "static" uses fixed floors
    #[serde(default = "default_fee_policy")]
    pub fee_policy: String,
    #[serde(default = "default_priority_fee_multiplier")]
    pub priority_fee_multiplier: u64,
    #[serde(default = "default_static_priority_fee_gwei")]
    pub static_priority_fee_gwei: u64,
    #[serde(default = "default_static_max_fee_gwei")]
    pub static_max_fee_gwei: u64,

    // Feed
    #[serde(default = "default_feed_backoff_secs")]
    pub feed_backoff_secs: u64,
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_interval_secs: u64,

    // Confirmation observation
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,

    // Health monitor / control surface
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointSettings {
    pub url: String,
    pub rank: Option<u32>,
    #[serde(default = "default_endpoint_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoanTierSettings {
    /// Observed-value breakpoint that activates this tier (ether string).
    pub whale_eth: String,
    /// Loan size requested from the executor at this tier (token units string).
    pub loan_eth: String,
}

// Defaults
fn default_debug() -> bool {
    false
}
fn default_false() -> bool {
    false
}
fn default_chain_id() -> u64 {
    constants::CHAIN_BASE
}
fn default_contract_address() -> Address {
    constants::APEX_EXECUTOR
}
fn default_whale_threshold() -> String {
    constants::DEFAULT_WHALE_THRESHOLD_ETH.to_string()
}
fn default_critical_gas_floor() -> String {
    constants::DEFAULT_CRITICAL_GAS_FLOOR_ETH.to_string()
}
fn default_loan_tiers() -> Vec<LoanTierSettings> {
    vec![
        LoanTierSettings {
            whale_eth: constants::DEFAULT_WHALE_THRESHOLD_ETH.to_string(),
            loan_eth: "100".to_string(),
        },
        LoanTierSettings {
            whale_eth: "0.5".to_string(),
            loan_eth: "250".to_string(),
        },
        LoanTierSettings {
            whale_eth: "5".to_string(),
            loan_eth: "500".to_string(),
        },
    ]
}
fn default_strike_gas_limit() -> u64 {
    constants::STRIKE_GAS_LIMIT
}
fn default_fee_policy() -> String {
    "aggressive".to_string()
}
fn default_priority_fee_multiplier() -> u64 {
    2
}
fn default_static_priority_fee_gwei() -> u64 {
    constants::DEFAULT_PRIORITY_FEE_GWEI
}
fn default_static_max_fee_gwei() -> u64 {
    30
}
fn default_feed_backoff_secs() -> u64 {
    2
}
fn default_keepalive_secs() -> u64 {
    30
}
fn default_receipt_poll_ms() -> u64 {
    500
}
fn default_receipt_timeout_ms() -> u64 {
    60_000
}
fn default_monitor_interval_secs() -> u64 {
    60
}
fn default_api_port() -> u16 {
    8080
}
fn default_endpoint_timeout_ms() -> u64 {
    2_000
}

/// Accept either structured endpoint tables or bare URL strings.
fn deserialize_endpoint_list<'de, D>(deserializer: D) -> Result<Vec<EndpointSettings>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{SeqAccess, Visitor};
    use std::fmt;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Url(String),
        Full(EndpointSettings),
    }

    struct EndpointVisitor;

    impl<'de> Visitor<'de> for EndpointVisitor {
        type Value = Vec<EndpointSettings>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a sequence of endpoint URLs or endpoint tables")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some(entry) = seq.next_element::<Entry>()? {
                out.push(match entry {
                    Entry::Url(url) => EndpointSettings {
                        url,
                        rank: None,
                        timeout_ms: default_endpoint_timeout_ms(),
                    },
                    Entry::Full(full) => full,
                });
            }
            Ok(out)
        }
    }

    deserializer.deserialize_seq(EndpointVisitor)
}

impl GlobalSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected) = path {
            builder = builder.add_source(File::from(Path::new(selected)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Deterministic precedence: CLI (in main) > env/.env > config file.
        builder = builder.add_source(Environment::default());

        let mut settings: GlobalSettings = builder.build()?.try_deserialize()?;

        // Allow RPC_ENDPOINTS env as a comma-separated URL list.
        if let Ok(raw) = std::env::var("RPC_ENDPOINTS") {
            settings.rpc_endpoints = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|url| EndpointSettings {
                    url: url.to_string(),
                    rank: None,
                    timeout_ms: default_endpoint_timeout_ms(),
                })
                .collect();
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.wallet_key.is_empty() {
            return Err(AppError::Config("WALLET_KEY is missing".to_string()));
        }
        if self.rpc_endpoints.is_empty() {
            return Err(AppError::Config(
                "At least one rpc_endpoints entry is required".to_string(),
            ));
        }
        if self.ws_endpoint.is_empty() {
            return Err(AppError::Config("WS_ENDPOINT is missing".to_string()));
        }
        if self.loan_tiers.is_empty() {
            return Err(AppError::Config(
                "loan_tiers must contain at least one tier".to_string(),
            ));
        }
        self.whale_threshold_wei()?;
        self.critical_gas_floor_wei()?;
        self.loan_tiers_wei()?;
        Ok(())
    }

    pub fn whale_threshold_wei(&self) -> Result<U256, AppError> {
        parse_eth_amount("whale_threshold_eth", &self.whale_threshold_eth)
    }

    pub fn critical_gas_floor_wei(&self) -> Result<U256, AppError> {
        parse_eth_amount("critical_gas_floor_eth", &self.critical_gas_floor_eth)
    }

    /// Tiers sorted ascending by breakpoint so tier selection is a simple scan.
    pub fn loan_tiers_wei(&self) -> Result<Vec<(U256, U256)>, AppError> {
        let mut tiers = Vec::with_capacity(self.loan_tiers.len());
        for tier in &self.loan_tiers {
            tiers.push((
                parse_eth_amount("loan_tiers.whale_eth", &tier.whale_eth)?,
                parse_eth_amount("loan_tiers.loan_eth", &tier.loan_eth)?,
            ));
        }
        tiers.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(tiers)
    }

    pub fn strike_token_in(&self) -> Address {
        self.token_in.unwrap_or(constants::WETH_BASE)
    }

    pub fn strike_token_out(&self) -> Address {
        self.token_out.unwrap_or(constants::DEGEN_BASE)
    }

    pub fn feed_backoff(&self) -> Duration {
        Duration::from_secs(self.feed_backoff_secs.max(1))
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs.max(1))
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms.max(50))
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs.max(1))
    }
}

fn parse_eth_amount(field: &str, raw: &str) -> Result<U256, AppError> {
    parse_ether(raw.trim())
        .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", field, raw, e)))
}
