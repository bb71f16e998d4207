// SPDX-License-Identifier: MIT
// Exercises the sequence-number manager against a local mock JSON-RPC node:
// local allocation must hand out consecutive values with no duplicates, and
// a resync must unconditionally adopt the pending-inclusive chain count.

use apex_striker::app::config::EndpointSettings;
use apex_striker::network::nonce::NonceManager;
use apex_striker::network::provider::EndpointPool;
use alloy::primitives::Address;
use serde_json::json;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Minimal JSON-RPC-over-HTTP server answering every request with the value
/// produced by `respond` for the request's method name.
async fn spawn_rpc<F>(respond: F) -> SocketAddr
where
    F: Fn(&str) -> serde_json::Value + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind rpc");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };

            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            let body = loop {
                let Ok(n) = socket.read(&mut buf).await else {
                    break None;
                };
                if n == 0 {
                    break None;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(split) = text.find("\r\n\r\n") {
                    let header = &text[..split];
                    let content_length = header
                        .lines()
                        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok()))
                        .unwrap_or(0);
                    let body = &text[split + 4..];
                    if body.len() >= content_length {
                        break Some(body.to_string());
                    }
                }
            };
            let Some(body) = body else { continue };

            let parsed: serde_json::Value = serde_json::from_str(&body).unwrap_or(json!({}));
            let id = parsed.get("id").cloned().unwrap_or(json!(1));
            let method = parsed
                .get("method")
                .and_then(|m| m.as_str())
                .unwrap_or("")
                .to_string();
            let payload = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": respond(&method),
            })
            .to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                payload.len(),
                payload
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    addr
}

fn pool_for(addr: SocketAddr) -> EndpointPool {
    EndpointPool::from_settings(&[EndpointSettings {
        url: format!("http://{}", addr),
        rank: None,
        timeout_ms: 2_000,
    }])
    .expect("pool")
}

#[tokio::test]
async fn resync_adopts_chain_count_and_allocation_advances() {
    let addr = spawn_rpc(|method| match method {
        "eth_getTransactionCount" => json!("0x2a"),
        _ => json!(null),
    })
    .await;

    let nonce = NonceManager::new(pool_for(addr), Address::ZERO);
    assert_eq!(nonce.resync().await.expect("resync"), 42);

    assert_eq!(nonce.allocate(), 42);
    assert_eq!(nonce.allocate(), 43);
    assert_eq!(nonce.allocate(), 44);
    assert_eq!(nonce.current(), 45);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocations_are_gapless_and_unique() {
    let addr = spawn_rpc(|method| match method {
        "eth_getTransactionCount" => json!("0x64"),
        _ => json!(null),
    })
    .await;

    let nonce = NonceManager::new(pool_for(addr), Address::ZERO);
    let v0 = nonce.resync().await.expect("resync");
    assert_eq!(v0, 100);

    const N: usize = 64;
    let mut handles = Vec::with_capacity(N);
    for _ in 0..N {
        let nonce = nonce.clone();
        handles.push(tokio::spawn(async move { nonce.allocate() }));
    }

    let mut values = HashSet::new();
    for handle in handles {
        assert!(values.insert(handle.await.expect("join")));
    }

    // Exactly {v0 .. v0 + N - 1}: no duplicates, no gaps.
    assert_eq!(values.len(), N);
    for v in v0..v0 + N as u64 {
        assert!(values.contains(&v), "missing allocation {v}");
    }
    assert_eq!(nonce.current(), v0 + N as u64);
}

#[tokio::test]
async fn resync_overrides_optimistic_value_after_conflict() {
    // First sync sees 42 pending; after the simulated conflict the chain
    // reports 100 and the local counter must follow it exactly.
    let calls = Arc::new(AtomicU64::new(0));
    let calls_rpc = calls.clone();
    let addr = spawn_rpc(move |method| match method {
        "eth_getTransactionCount" => {
            if calls_rpc.fetch_add(1, Ordering::SeqCst) == 0 {
                json!("0x2a")
            } else {
                json!("0x64")
            }
        }
        _ => json!(null),
    })
    .await;

    let nonce = NonceManager::new(pool_for(addr), Address::ZERO);
    assert_eq!(nonce.resync().await.expect("first resync"), 42);

    // Optimistic burst races ahead of the chain.
    nonce.allocate();
    nonce.allocate();
    assert_eq!(nonce.current(), 44);

    assert_eq!(nonce.resync().await.expect("conflict resync"), 100);
    assert_eq!(nonce.allocate(), 100);
    assert_eq!(nonce.allocate(), 101);
}
