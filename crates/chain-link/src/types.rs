//! Plain data types exchanged between the link, its backends and its callers.

use std::fmt;

use alloy_primitives::{Address, Bytes, B256};

/// Hash identifying a submitted transaction.
pub type TxHash = B256;

/// An encoded contract method invocation.
///
/// The method name is carried alongside the calldata so that logs, errors and test doubles can
/// refer to the call without decoding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    to: Address,
    method: &'static str,
    input: Bytes,
}

impl ContractCall {
    /// Creates a call of `method` on the contract at `to` with ABI-encoded `input`.
    pub fn new(to: Address, method: &'static str, input: impl Into<Bytes>) -> Self {
        Self {
            to,
            method,
            input: input.into(),
        }
    }

    /// The contract address.
    pub const fn to(&self) -> Address {
        self.to
    }

    /// The contract method name.
    pub const fn method(&self) -> &'static str {
        self.method
    }

    /// The ABI-encoded calldata, including the selector.
    pub const fn input(&self) -> &Bytes {
        &self.input
    }
}

/// How the gas limit of a submission should be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasLimit {
    /// Use the gas limit configured on the link.
    Configured,

    /// Ask the node for an estimate and cap it at the configured gas limit.
    Estimate,
}

/// Options a transaction is signed with.
///
/// Only [`ChainLink`](crate::ChainLink) builds these, while holding its submission lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub(crate) from: Address,
    pub(crate) nonce: u64,
    pub(crate) gas_price: u128,
    pub(crate) gas_limit: u64,
}

impl TxOptions {
    /// The sender address.
    pub const fn from(&self) -> Address {
        self.from
    }

    /// The nonce assigned to the transaction.
    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The gas price in wei.
    pub const fn gas_price(&self) -> u128 {
        self.gas_price
    }

    /// The gas limit.
    pub const fn gas_limit(&self) -> u64 {
        self.gas_limit
    }
}

/// Inclusion status of a transaction as reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The node does not know the transaction (not propagated yet, or dropped).
    Unknown,

    /// The transaction is in the mempool.
    Pending,

    /// The transaction has been included in a block.
    Mined {
        /// Whether execution succeeded.
        success: bool,
    },
}

/// Final result of waiting for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclusionOutcome {
    /// Mined and executed successfully.
    Success,

    /// Mined but execution reverted.
    Reverted,
}

impl fmt::Display for InclusionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InclusionOutcome::Success => write!(f, "success"),
            InclusionOutcome::Reverted => write!(f, "reverted"),
        }
    }
}
