//! The `StakePortalRate` mirror contract on the secondary chain.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chain_link::{ChainBackend, ChainLink, ContractCall};

use crate::{
    abi::IStakePortalRate,
    calls::{self, read},
    errors::ContractError,
    proposal::{Proposal, ProposalStatus},
};

/// Read access to the rate mirror and a builder for its voting call.
#[async_trait]
pub trait StakePortalRate: Send + Sync + 'static {
    /// The rate currently applied on the secondary chain.
    async fn rate(&self) -> Result<U256, ContractError>;

    /// The proposal stored under `proposal_id`.
    ///
    /// Unknown ids read as an [`Inactive`](ProposalStatus::Inactive) proposal with no votes.
    async fn proposal(&self, proposal_id: B256) -> Result<Proposal, ContractError>;

    /// Whether `voter` already voted on `proposal_id`.
    async fn has_voted(&self, proposal_id: B256, voter: Address) -> Result<bool, ContractError>;

    /// Calldata voting for `rate` under `proposal_id`.
    fn vote_rate(&self, proposal_id: B256, rate: U256) -> ContractCall;
}

/// [`StakePortalRate`] backed by a deployed contract.
#[derive(Debug)]
pub struct StakePortalRateContract<B> {
    address: Address,
    link: Arc<ChainLink<B>>,
}

impl<B: ChainBackend> StakePortalRateContract<B> {
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
impl<B: ChainBackend> StakePortalRate for StakePortalRateContract<B> {
    async fn rate(&self) -> Result<U256, ContractError> {
        read(&self.link, self.address, "getRate", IStakePortalRate::getRateCall {}).await
    }

    async fn proposal(&self, proposal_id: B256) -> Result<Proposal, ContractError> {
        let call = IStakePortalRate::proposalsCall {
            proposalId: proposal_id,
        };
        let ret = read(&self.link, self.address, "proposals", call).await?;

        Ok(Proposal {
            status: ProposalStatus::from(ret.status),
            yes_votes: ret.yesVotes,
        })
    }

    async fn has_voted(&self, proposal_id: B256, voter: Address) -> Result<bool, ContractError> {
        let call = IStakePortalRate::hasVotedCall {
            proposalId: proposal_id,
            voter,
        };
        read(&self.link, self.address, "hasVoted", call).await
    }

    fn vote_rate(&self, proposal_id: B256, rate: U256) -> ContractCall {
        calls::vote_rate(self.address, proposal_id, rate)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Bytes;
    use alloy_sol_types::{SolCall, SolValue};
    use chain_link::{ChainError, GasPolicy, TxHash, TxOptions, TxStatus};

    use super::*;

    /// Answers read calls with canned return data keyed by method name.
    #[derive(Debug)]
    struct CannedBackend;

    #[async_trait]
    impl ChainBackend for CannedBackend {
        fn signer_address(&self) -> Address {
            Address::repeat_byte(0x11)
        }

        async fn chain_id(&self) -> Result<u64, ChainError> {
            Ok(137)
        }

        async fn call(&self, call: &ContractCall) -> Result<Bytes, ChainError> {
            let output = match call.method() {
                "getRate" => U256::from(1_000_000u64).abi_encode(),
                "proposals" => IStakePortalRate::proposalsCall::abi_encode_returns(
                    &IStakePortalRate::proposalsReturn {
                        status: 2,
                        yesVotes: 3,
                        yesVotesTotal: 4,
                    },
                ),
                "hasVoted" => true.abi_encode(),
                _ => Vec::new(),
            };
            Ok(output.into())
        }

        async fn pending_nonce(&self, _address: Address) -> Result<u64, ChainError> {
            Ok(0)
        }

        async fn gas_price(&self) -> Result<u128, ChainError> {
            Ok(1)
        }

        async fn estimate_gas(
            &self,
            _call: &ContractCall,
            _from: Address,
        ) -> Result<u64, ChainError> {
            Ok(21_000)
        }

        async fn send_transaction(
            &self,
            call: &ContractCall,
            _options: &TxOptions,
        ) -> Result<TxHash, ChainError> {
            Err(ChainError::broadcast(call.method(), "read-only backend"))
        }

        async fn transaction_status(&self, _tx_hash: TxHash) -> Result<TxStatus, ChainError> {
            Ok(TxStatus::Unknown)
        }
    }

    fn portal() -> StakePortalRateContract<CannedBackend> {
        let policy = GasPolicy::new(1_000_000, 1).unwrap();
        let link = ChainLink::new("secondary", CannedBackend, policy).unwrap();
        StakePortalRateContract::new(Address::repeat_byte(0x22), Arc::new(link))
    }

    #[tokio::test]
    async fn reads_are_decoded() {
        let portal = portal();

        assert_eq!(portal.rate().await.unwrap(), U256::from(1_000_000u64));

        let proposal = portal.proposal(B256::ZERO).await.unwrap();
        assert_eq!(proposal.status, ProposalStatus::Executed);
        assert_eq!(proposal.yes_votes, 3);
        assert!(proposal.is_executed());

        assert!(portal.has_voted(B256::ZERO, Address::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_return_data_is_a_decode_error() {
        let policy = GasPolicy::new(1, 1).unwrap();
        let link = Arc::new(ChainLink::new("primary", CannedBackend, policy).unwrap());
        let manager = crate::StakeManagerContract::new(Address::repeat_byte(0x33), link);

        let err = crate::StakeManager::current_era(&manager).await.unwrap_err();
        assert!(matches!(err, ContractError::Decode { method: "currentEra", .. }));
    }
}
