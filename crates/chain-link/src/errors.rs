//! Error types for chain access and transaction tracking.

use std::time::Duration;

use thiserror::Error;

use crate::types::TxHash;

/// Errors surfaced by a [`ChainBackend`](crate::ChainBackend) or a
/// [`ChainLink`](crate::ChainLink).
#[derive(Debug, Error)]
pub enum ChainError {
    /// The node could not answer a request: timeouts, connection failures, malformed responses.
    #[error("rpc request `{method}` failed: {reason}")]
    Rpc {
        /// The RPC method or contract call that failed.
        method: &'static str,
        /// Human readable cause reported by the transport.
        reason: String,
    },

    /// The transaction was rejected before it reached the mempool.
    ///
    /// No nonce is consumed when this happens.
    #[error("failed to broadcast `{method}`: {reason}")]
    Broadcast {
        /// The contract method that was being submitted.
        method: &'static str,
        /// Human readable cause reported by the node.
        reason: String,
    },

    /// The signer or gas configuration is unusable.
    #[error("invalid chain configuration: {0}")]
    InvalidConfig(String),
}

impl ChainError {
    /// Convenience constructor for [`ChainError::Rpc`].
    pub fn rpc(method: &'static str, reason: impl ToString) -> Self {
        Self::Rpc {
            method,
            reason: reason.to_string(),
        }
    }

    /// Convenience constructor for [`ChainError::Broadcast`].
    pub fn broadcast(method: &'static str, reason: impl ToString) -> Self {
        Self::Broadcast {
            method,
            reason: reason.to_string(),
        }
    }
}

/// Errors returned by [`ConfirmationWatcher`](crate::ConfirmationWatcher).
#[derive(Debug, Error)]
pub enum WatchError {
    /// The transaction was not observed as mined within the retry budget.
    #[error("transaction {tx_hash} not mined after {attempts} attempts ({ceiling:?})")]
    RetryExhausted {
        /// The transaction being watched.
        tx_hash: TxHash,
        /// Number of status lookups performed.
        attempts: u32,
        /// Wall-clock ceiling of the retry policy.
        ceiling: Duration,
    },

    /// The shutdown signal fired while waiting.
    #[error("stopped while waiting for transaction {0}")]
    Cancelled(TxHash),
}
