//! # `chain-link`
//!
//! `chain-link` wraps a single EVM chain behind a [`ChainLink`](link::ChainLink): read-only
//! contract calls, serialized transaction submission with nonce and gas management, and a
//! [`ConfirmationWatcher`](watcher::ConfirmationWatcher) that waits for transactions to be mined
//! with a bounded retry budget.

pub mod backend;
pub mod errors;
pub mod evm;
pub mod link;
pub mod policy;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod test_backend;

pub use backend::ChainBackend;
pub use errors::{ChainError, WatchError};
pub use link::ChainLink;
pub use policy::{sleep_unless_cancelled, GasPolicy, RetryPolicy};
pub use types::{ContractCall, GasLimit, InclusionOutcome, TxHash, TxOptions, TxStatus};
pub use watcher::ConfirmationWatcher;
