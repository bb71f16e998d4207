// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::error::AppError;
use crate::common::seen_cache::SeenCache;
use crate::infrastructure::network::provider::{ConnectionFactory, WsProvider};
use alloy::primitives::B256;
use alloy::providers::Provider;
use alloy::pubsub::SubscriptionStream;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
const SEEN_MAX: usize = 4;
#[cfg(not(test))]
const SEEN_MAX: usize = 50_000;

enum FeedState {
    Connecting,
    Subscribed(SubscribedFeed),
    Dropped,
}

struct SubscribedFeed {
    provider: WsProvider,
    stream: SubscriptionStream<B256>,
}

/// Supervises the pending-transaction subscription. Disconnection is routine:
/// the state machine walks Connecting -> Subscribed -> Dropped -> Connecting
/// forever, with a fixed backoff between attempts. While subscribed, a
/// periodic probe over the same socket catches drops the transport never
/// reports as a close event.
pub struct MempoolScanner {
    ws_url: String,
    sender: UnboundedSender<B256>,
    backoff: Duration,
    keepalive: Duration,
    shutdown: CancellationToken,
    seen: SeenCache<B256>,
}

impl MempoolScanner {
    pub fn new(
        ws_url: String,
        sender: UnboundedSender<B256>,
        backoff: Duration,
        keepalive: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ws_url,
            sender,
            backoff,
            keepalive,
            shutdown,
            seen: SeenCache::new(SEEN_MAX),
        }
    }

    pub async fn run(self) -> Result<(), AppError> {
        tracing::info!(target: "mempool", ws = %self.ws_url, "Mempool scanner started");

        let mut state = FeedState::Connecting;
        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!(target: "mempool", "Shutdown requested; stopping scanner");
                return Ok(());
            }

            state = match state {
                FeedState::Connecting => match self.subscribe().await {
                    Ok(feed) => {
                        tracing::info!(target: "mempool", "Subscribed to pending transactions");
                        FeedState::Subscribed(feed)
                    }
                    Err(e) => {
                        tracing::warn!(target: "mempool", error = %e, "Subscribe failed");
                        FeedState::Dropped
                    }
                },
                FeedState::Subscribed(feed) => {
                    self.pump(feed).await;
                    FeedState::Dropped
                }
                FeedState::Dropped => {
                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            tracing::info!(target: "mempool", "Shutdown requested during reconnect backoff");
                            return Ok(());
                        }
                        _ = sleep(self.backoff) => FeedState::Connecting,
                    }
                }
            };
        }
    }

    async fn subscribe(&self) -> Result<SubscribedFeed, AppError> {
        let provider = ConnectionFactory::ws(&self.ws_url).await?;
        let sub = provider
            .subscribe_pending_transactions()
            .await
            .map_err(|e| AppError::Connection(format!("Pending subscription failed: {}", e)))?;

        Ok(SubscribedFeed {
            provider,
            stream: sub.into_stream(),
        })
    }

    /// Drain the subscription until it drops. Dispatch never blocks the
    /// receive loop: hashes go out on an unbounded channel.
    async fn pump(&self, mut feed: SubscribedFeed) {
        let mut keepalive = tokio::time::interval(self.keepalive);
        keepalive.tick().await; // the first tick is immediate

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: "mempool", "Shutdown requested; leaving pending stream");
                    return;
                }
                _ = keepalive.tick() => {
                    if let Err(e) = feed.provider.get_chain_id().await {
                        tracing::warn!(target: "mempool", error = %e, "Keep-alive probe failed; treating as drop");
                        return;
                    }
                }
                maybe_hash = feed.stream.next() => {
                    match maybe_hash {
                        Some(hash) => {
                            if !self.mark_seen(hash).await {
                                continue;
                            }
                            if self.sender.send(hash).is_err() {
                                tracing::info!(target: "mempool", "Dispatch channel closed; stopping stream");
                                return;
                            }
                        }
                        None => {
                            tracing::warn!(target: "mempool", "Pending subscription ended, reconnecting after backoff");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn mark_seen(&self, hash: B256) -> bool {
        self.seen.insert(hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn hash(byte: u8) -> B256 {
        B256::from_slice(&[byte; 32])
    }

    #[tokio::test]
    async fn duplicate_hashes_are_filtered_until_evicted() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scanner = MempoolScanner::new(
            "ws://localhost:8546".to_string(),
            tx,
            Duration::from_secs(2),
            Duration::from_secs(30),
            CancellationToken::new(),
        );

        assert!(scanner.mark_seen(hash(1)).await);
        assert!(!scanner.mark_seen(hash(1)).await, "replay must be dropped");

        // Fill the bounded window past SEEN_MAX so the first entry ages out.
        for byte in 2..=5 {
            assert!(scanner.mark_seen(hash(byte)).await);
        }
        assert!(
            scanner.mark_seen(hash(1)).await,
            "evicted hash counts as fresh again"
        );
    }
}
