// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("RPC rejected {op}: {message}")]
    Rpc { op: String, message: String },

    #[error("Transaction failed: {hash:?}, reason: {reason}")]
    Transaction { hash: String, reason: String },

    #[error("Strategy execution error: {0}")]
    Strategy(String),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// A send-time rejection that means our nonce raced another in-flight
    /// submission (stale, duplicate, or an underpriced replacement).
    pub fn is_sequence_conflict(&self) -> bool {
        match self {
            AppError::Rpc { message, .. } => is_sequence_conflict_message(message),
            AppError::Transaction { reason, .. } => is_sequence_conflict_message(reason),
            _ => false,
        }
    }
}

pub fn is_sequence_conflict_message(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("nonce") || msg.contains("replacement transaction underpriced")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_nonce_conflicts() {
        assert!(is_sequence_conflict_message("nonce too low"));
        assert!(is_sequence_conflict_message("Nonce gap detected"));
        assert!(is_sequence_conflict_message(
            "replacement transaction underpriced"
        ));
        assert!(!is_sequence_conflict_message("insufficient funds for gas"));
    }

    #[test]
    fn rpc_variant_carries_conflict() {
        let err = AppError::Rpc {
            op: "send_raw_transaction".into(),
            message: "nonce too low: next nonce 7".into(),
        };
        assert!(err.is_sequence_conflict());
        assert!(!AppError::Connection("timed out".into()).is_sequence_conflict());
    }
}
