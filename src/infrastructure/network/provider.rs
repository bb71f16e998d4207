// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::app::config::EndpointSettings;
use crate::common::error::AppError;
use alloy::network::Ethereum;
use alloy::providers::RootProvider;
use alloy::transports::TransportError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

pub type HttpProvider = RootProvider<Ethereum>;
pub type WsProvider = RootProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    pub fn http(rpc_url: &str) -> Result<HttpProvider, AppError> {
        let url =
            Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;

        let provider = RootProvider::new_http(url);
        Ok(provider)
    }

    pub async fn ws(ws_url: &str) -> Result<WsProvider, AppError> {
        let provider = RootProvider::connect(ws_url)
            .await
            .map_err(|e| AppError::Connection(format!("WS Connection failed: {}", e)))?;

        Ok(provider)
    }
}

struct RankedEndpoint {
    url: String,
    rank: u32,
    timeout: Duration,
    provider: HttpProvider,
}

/// Rank-ordered set of read/submit endpoints. Every call walks the ranking
/// from the preferred endpoint down; an attempt is bounded by that endpoint's
/// own timeout. A definitive JSON-RPC rejection (the node answered) is final
/// and returned to the caller; transport failures and timeouts fall through
/// to the next rank. Only when every endpoint fails does the pool error.
#[derive(Clone)]
pub struct EndpointPool {
    endpoints: Arc<Vec<RankedEndpoint>>,
}

impl EndpointPool {
    pub fn from_settings(settings: &[EndpointSettings]) -> Result<Self, AppError> {
        if settings.is_empty() {
            return Err(AppError::Config(
                "Endpoint pool requires at least one endpoint".into(),
            ));
        }

        let mut endpoints = Vec::with_capacity(settings.len());
        for (idx, ep) in settings.iter().enumerate() {
            endpoints.push(RankedEndpoint {
                url: ep.url.clone(),
                rank: ep.rank.unwrap_or(idx as u32),
                timeout: Duration::from_millis(ep.timeout_ms),
                provider: ConnectionFactory::http(&ep.url)?,
            });
        }
        endpoints.sort_by_key(|ep| ep.rank);

        Ok(Self {
            endpoints: Arc::new(endpoints),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Run `f` against endpoints in rank order until one answers.
    pub async fn query<T, F, Fut>(&self, op: &str, f: F) -> Result<T, AppError>
    where
        F: Fn(HttpProvider) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        for ep in self.endpoints.iter() {
            match timeout(ep.timeout, f(ep.provider.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => {
                    if let Some(payload) = err.as_error_resp() {
                        return Err(AppError::Rpc {
                            op: op.to_string(),
                            message: payload.message.to_string(),
                        });
                    }
                    tracing::warn!(
                        target: "rpc",
                        endpoint = %ep.url,
                        op,
                        error = %err,
                        "Endpoint failed; trying next rank"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        target: "rpc",
                        endpoint = %ep.url,
                        op,
                        timeout_ms = ep.timeout.as_millis() as u64,
                        "Endpoint timed out; trying next rank"
                    );
                }
            }
        }

        Err(AppError::Connection(format!(
            "{}: all {} endpoints failed",
            op,
            self.endpoints.len()
        )))
    }
}
