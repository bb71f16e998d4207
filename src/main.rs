// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::signers::local::PrivateKeySigner;
use apex_striker::app::config::GlobalSettings;
use apex_striker::app::logging::setup_logging;
use apex_striker::core::engine::Engine;
use apex_striker::domain::error::AppError;
use clap::Parser;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(author, version, about = "apex striker")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long)]
    config: Option<String>,

    /// Do not submit transactions, only observe and log
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Control-surface port (overrides config/env)
    #[arg(long)]
    api_port: Option<u16>,

    /// Emit JSON log lines instead of the compact format
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut settings = GlobalSettings::load_with_path(cli.config.as_deref())?;
    setup_logging(
        if settings.debug { "debug" } else { "info" },
        cli.json_logs,
    );

    if let Some(port) = cli.api_port {
        settings.api_port = port;
    }
    let dry_run = cli.dry_run || settings.dry_run;

    let signer = PrivateKeySigner::from_str(&settings.wallet_key)
        .map_err(|e| AppError::Config(format!("Invalid wallet key: {}", e)))?;
    tracing::info!(
        target: "engine",
        wallet = %signer.address(),
        contract = %settings.contract_address,
        endpoints = settings.rpc_endpoints.len(),
        dry_run,
        "Starting apex striker"
    );

    let engine = Engine::new(&settings, signer, dry_run)?;
    engine.run().await
}
