//! Error types of the sync engines and the scheduler.

use std::time::Duration;

use alloy_primitives::B256;
use chain_link::{ChainError, WatchError};
use stake_relay_contracts::ContractError;
use thiserror::Error;

/// Failure of a single sync cycle.
///
/// None of these stop a loop; the next tick starts a fresh cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A contract read failed.
    #[error("contract read failed: {0}")]
    Contract(#[from] ContractError),

    /// A transaction could not be broadcast.
    #[error("transaction submission failed: {0}")]
    Submit(#[from] ChainError),

    /// A broadcast transaction was not seen mined in time.
    #[error("transaction confirmation failed: {0}")]
    Confirmation(WatchError),

    /// `latestEra` did not reach the submitted era in time.
    #[error("era {era} not executed within {waited:?}")]
    EraExecutionTimeout {
        /// The era that was submitted.
        era: u64,
        /// How long the engine waited.
        waited: Duration,
    },

    /// A voted proposal was not executed in time.
    #[error("proposal {proposal_id} not executed within {waited:?}")]
    ProposalTimeout {
        /// The proposal voted on.
        proposal_id: B256,
        /// How long the engine waited.
        waited: Duration,
    },

    /// The era does not fit in the 32 bits a proposal id encodes.
    #[error("era {0} cannot be encoded in a proposal id")]
    EraOutOfRange(u64),

    /// The stop signal fired mid-cycle.
    #[error("cycle cancelled")]
    Cancelled,
}

impl SyncError {
    /// Numeric code reported to the metrics sink.
    ///
    /// Errors without a dedicated code report `-1`.
    pub const fn code(&self) -> i32 {
        match self {
            SyncError::Contract(_) => 1,
            SyncError::Submit(_) => 2,
            SyncError::Confirmation(_) => 3,
            SyncError::EraExecutionTimeout { .. } => 4,
            SyncError::ProposalTimeout { .. } => 5,
            SyncError::EraOutOfRange(_) => 6,
            SyncError::Cancelled => -1,
        }
    }
}

impl From<WatchError> for SyncError {
    fn from(err: WatchError) -> Self {
        match err {
            WatchError::Cancelled(_) => SyncError::Cancelled,
            other => SyncError::Confirmation(other),
        }
    }
}

/// Precondition failures that prevent the scheduler from starting.
#[derive(Debug, Error)]
pub enum StartError {
    /// A chain link failed validation.
    #[error("chain link validation failed: {0}")]
    Chain(#[from] ChainError),

    /// A startup contract read failed.
    #[error("startup contract read failed: {0}")]
    Contract(#[from] ContractError),

    /// The primary chain id is not one the relay is deployed on.
    #[error("unsupported primary chain id {0}")]
    UnsupportedChain(u64),

    /// The loop period is zero.
    #[error("task interval must be non-zero")]
    ZeroTaskInterval,

    /// The stake manager reports no bonded pools.
    #[error("stake manager has no bonded pools")]
    NoBondedPools,

    /// `start` was already called.
    #[error("scheduler already started")]
    AlreadyStarted,

    /// The scheduler was stopped and cannot be started again.
    #[error("scheduler stopped")]
    Stopped,
}
