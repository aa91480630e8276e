//! Errors raised while talking to the staking contracts.

use alloy_primitives::U256;
use chain_link::ChainError;
use thiserror::Error;

/// Errors returned by the contract wrappers.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The underlying chain request failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The contract returned data that does not match its ABI.
    #[error("could not decode the return data of `{method}`: {source}")]
    Decode {
        /// The contract method that was called.
        method: &'static str,
        /// The decoding failure.
        source: alloy_sol_types::Error,
    },

    /// A value that the relay handles as a 64-bit integer does not fit in one.
    #[error("`{method}` returned {value}, which does not fit in 64 bits")]
    Overflow {
        /// The contract method that was called.
        method: &'static str,
        /// The returned value.
        value: U256,
    },
}
