// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::services::strategy::executor::StrikeExecutor;
use crate::services::strategy::stats::StrikeStats;
use alloy::primitives::utils::format_ether;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct ControlContext {
    pub executor: Arc<StrikeExecutor>,
    pub stats: Arc<StrikeStats>,
}

/// Operator surface, deliberately outside the hot path. Withdrawals hold
/// their connection until the receipt lands, so every connection gets its
/// own task.
pub async fn spawn_control_server(port: u16, ctx: ControlContext) -> Option<SocketAddr> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!(target: "api", "Control server failed to bind: {}", e);
            return None;
        }
    };

    let local = listener.local_addr().ok();
    if let Some(addr) = local {
        tracing::info!(target: "api", "Control server listening on {}", addr);
    }

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        handle_connection(socket, ctx).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(target: "api", "Control accept error: {}", e);
                    continue;
                }
            }
        }
    });

    local
}

async fn handle_connection(mut socket: tokio::net::TcpStream, ctx: ControlContext) {
    // Very small HTTP parser; two routes is all the surface there is.
    let mut buf = [0u8; 1024];
    let n = socket.read(&mut buf).await.unwrap_or(0);
    let req = String::from_utf8_lossy(&buf[..n]).to_string();
    let mut parts = req.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("/");
    let route = path.split('?').next().unwrap_or(path);

    let (status_line, body) = match (method, route) {
        ("GET", "/status") => ("200 OK", render_status(&ctx).await),
        ("POST", "/withdraw") => match ctx.executor.withdraw().await {
            Ok((hash, true)) => (
                "200 OK",
                json!({"success": true, "hash": format!("{:#x}", hash)}).to_string(),
            ),
            Ok((hash, false)) => (
                "500 Internal Server Error",
                json!({"error": "withdraw reverted", "hash": format!("{:#x}", hash)}).to_string(),
            ),
            Err(e) => (
                "500 Internal Server Error",
                json!({"error": e.to_string()}).to_string(),
            ),
        },
        _ => ("404 Not Found", json!({"error": "not found"}).to_string()),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
}

async fn render_status(ctx: &ControlContext) -> String {
    let wallet = ctx.executor.wallet_balance().await;
    let contract = ctx.executor.contract_earnings().await;

    match (wallet, contract) {
        (Ok(wallet_wei), Ok(contract_wei)) => json!({
            "status": "HUNTING",
            "wallet_eth": format_ether(wallet_wei),
            "contract_weth": format_ether(contract_wei),
            "estimated_earnings_usd": ctx.stats.earnings_usd(),
            "processed": ctx.stats.processed.load(Ordering::Relaxed),
            "skipped": ctx.stats.skipped.load(Ordering::Relaxed),
            "submitted": ctx.stats.submitted.load(Ordering::Relaxed),
            "confirmed": ctx.stats.confirmed.load(Ordering::Relaxed),
            "reverted": ctx.stats.reverted.load(Ordering::Relaxed),
            "failed": ctx.stats.failed.load(Ordering::Relaxed),
        })
        .to_string(),
        (wallet, contract) => {
            if let Err(e) = wallet.and(contract) {
                tracing::warn!(target: "api", error = %e, "Status read failed");
            }
            json!({"status": "ERROR"}).to_string()
        }
    }
}
