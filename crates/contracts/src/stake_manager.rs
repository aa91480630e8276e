//! The `StakeManager` contract on the primary chain.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chain_link::{ChainBackend, ChainLink, ContractCall};

use crate::{
    abi::IStakeManager,
    calls::{self, read, to_u64},
    errors::ContractError,
};

/// Read access to the `StakeManager` and a builder for its era-advancing call.
#[async_trait]
pub trait StakeManager: Send + Sync + 'static {
    /// The era the contract should be in according to the current block.
    async fn current_era(&self) -> Result<u64, ContractError>;

    /// The last era that has been executed.
    async fn latest_era(&self) -> Result<u64, ContractError>;

    /// The current exchange rate.
    async fn rate(&self) -> Result<U256, ContractError>;

    /// The pools currently bonded to the manager.
    async fn bonded_pools(&self) -> Result<Vec<Address>, ContractError>;

    /// Calldata advancing the contract by one era.
    fn new_era(&self) -> ContractCall;
}

/// [`StakeManager`] backed by a deployed contract.
#[derive(Debug)]
pub struct StakeManagerContract<B> {
    address: Address,
    link: Arc<ChainLink<B>>,
}

impl<B: ChainBackend> StakeManagerContract<B> {
    /// Binds to the contract at `address` on `link`.
    pub const fn new(address: Address, link: Arc<ChainLink<B>>) -> Self {
        Self { address, link }
    }

    /// The contract address.
    pub const fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl<B: ChainBackend> StakeManager for StakeManagerContract<B> {
    async fn current_era(&self) -> Result<u64, ContractError> {
        let call = IStakeManager::currentEraCall {};
        let era = read(&self.link, self.address, "currentEra", call).await?;
        to_u64("currentEra", era)
    }

    async fn latest_era(&self) -> Result<u64, ContractError> {
        let call = IStakeManager::latestEraCall {};
        let era = read(&self.link, self.address, "latestEra", call).await?;
        to_u64("latestEra", era)
    }

    async fn rate(&self) -> Result<U256, ContractError> {
        read(&self.link, self.address, "getRate", IStakeManager::getRateCall {}).await
    }

    async fn bonded_pools(&self) -> Result<Vec<Address>, ContractError> {
        read(
            &self.link,
            self.address,
            "getBondedPools",
            IStakeManager::getBondedPoolsCall {},
        )
        .await
    }

    fn new_era(&self) -> ContractCall {
        calls::new_era(self.address)
    }
}
