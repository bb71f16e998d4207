// SPDX-License-Identifier: MIT
// Simulates a pending-transaction feed that drops its transport after every
// notification. The subscriber must keep delivering fresh identifiers across
// reconnects, and treat an unreachable feed as routine rather than fatal.

use apex_striker::network::mempool::MempoolScanner;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const SUB_ID: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

fn hash_for(conn: usize) -> String {
    format!("0x{:064x}", 0xabc0 + conn)
}

/// One feed connection: answer the subscribe call, push a single pending
/// hash, then drop the socket to simulate a transport close.
async fn serve_feed_once(stream: TcpStream, conn: usize) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws.split();

    while let Some(Ok(msg)) = read.next().await {
        if !msg.is_text() {
            continue;
        }
        let Ok(req) = serde_json::from_str::<serde_json::Value>(msg.to_text().unwrap_or("{}"))
        else {
            continue;
        };
        let id = req.get("id").cloned().unwrap_or(json!(1));
        let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("");

        if method == "eth_subscribe" {
            let ack = json!({"jsonrpc": "2.0", "id": id, "result": SUB_ID}).to_string();
            if write.send(Message::Text(ack.into())).await.is_err() {
                return;
            }
            let notify = json!({
                "jsonrpc": "2.0",
                "method": "eth_subscription",
                "params": {"subscription": SUB_ID, "result": hash_for(conn)},
            })
            .to_string();
            let _ = write.send(Message::Text(notify.into())).await;
            // Give the client a moment to consume, then hang up.
            sleep(Duration::from_millis(200)).await;
            return;
        }

        // Anything else (keep-alive probes etc.) gets a generic answer.
        let reply = json!({"jsonrpc": "2.0", "id": id, "result": "0x2105"}).to_string();
        if write.send(Message::Text(reply.into())).await.is_err() {
            return;
        }
    }
}

async fn spawn_flaky_feed() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind feed");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let mut conn = 0usize;
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(serve_feed_once(stream, conn));
            conn += 1;
        }
    });

    addr
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn survives_transport_close_and_keeps_dispatching() {
    let addr = spawn_flaky_feed().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let shutdown = tokio_util::sync::CancellationToken::new();

    let scanner = MempoolScanner::new(
        format!("ws://{}", addr),
        tx,
        Duration::from_millis(100),
        Duration::from_secs(30),
        shutdown.clone(),
    );
    let scanner_task = tokio::spawn(scanner.run());

    // First identifier arrives on the first connection...
    let first = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("first hash in time")
        .expect("channel open");

    // ...and after the server hangs up, a reconnect delivers the next one
    // without a process restart.
    let second = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("second hash in time")
        .expect("channel open");

    assert_ne!(first, second, "each connection pushes a distinct hash");

    shutdown.cancel();
    let _ = timeout(Duration::from_secs(5), scanner_task).await;
}

#[tokio::test]
async fn unreachable_feed_is_routine_not_fatal() {
    // A port nothing listens on.
    let probe = TcpListener::bind("127.0.0.1:0").await.expect("probe bind");
    let dead = probe.local_addr().expect("local addr");
    drop(probe);

    let (tx, _rx) = mpsc::unbounded_channel();
    let shutdown = tokio_util::sync::CancellationToken::new();
    let scanner = MempoolScanner::new(
        format!("ws://{}", dead),
        tx,
        Duration::from_millis(50),
        Duration::from_secs(30),
        shutdown.clone(),
    );
    let task = tokio::spawn(scanner.run());

    // Let it cycle Connecting -> Dropped a few times.
    sleep(Duration::from_millis(300)).await;
    assert!(!task.is_finished(), "scanner must keep retrying");

    shutdown.cancel();
    let result = timeout(Duration::from_secs(5), task)
        .await
        .expect("scanner exits on shutdown")
        .expect("join");
    assert!(result.is_ok());
}
