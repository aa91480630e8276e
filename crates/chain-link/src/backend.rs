//! The seam between a [`ChainLink`](crate::ChainLink) and an actual node.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::{
    errors::ChainError,
    types::{ContractCall, TxHash, TxOptions, TxStatus},
};

/// Raw access to one chain through one signing identity.
///
/// Implementations must not cache nonces or gas prices themselves; the link owning the backend
/// decides both while holding its submission lock.
#[async_trait]
pub trait ChainBackend: Send + Sync + 'static {
    /// The address transactions are signed with.
    fn signer_address(&self) -> Address;

    /// The chain id reported by the node.
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Executes a read-only call against the latest state.
    async fn call(&self, call: &ContractCall) -> Result<Bytes, ChainError>;

    /// The next nonce for `address`, including transactions still in the mempool.
    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError>;

    /// The node's suggested gas price in wei.
    async fn gas_price(&self) -> Result<u128, ChainError>;

    /// Estimates the gas `call` would consume if sent from `from`.
    async fn estimate_gas(&self, call: &ContractCall, from: Address) -> Result<u64, ChainError>;

    /// Signs `call` with `options` and broadcasts it.
    async fn send_transaction(
        &self,
        call: &ContractCall,
        options: &TxOptions,
    ) -> Result<TxHash, ChainError>;

    /// Looks up the inclusion status of a transaction.
    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, ChainError>;
}
