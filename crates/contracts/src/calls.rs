//! Calldata builders and the shared read path.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use chain_link::{ChainBackend, ChainLink, ContractCall};

use crate::{
    abi::{IStakeManager, IStakePortalRate},
    errors::ContractError,
};

/// `StakeManager.newEra()` on the contract at `contract`.
pub fn new_era(contract: Address) -> ContractCall {
    ContractCall::new(contract, "newEra", IStakeManager::newEraCall {}.abi_encode())
}

/// `StakePortalRate.voteRate(proposal_id, rate)` on the contract at `contract`.
pub fn vote_rate(contract: Address, proposal_id: B256, rate: U256) -> ContractCall {
    let call = IStakePortalRate::voteRateCall {
        proposalId: proposal_id,
        rate,
    };

    ContractCall::new(contract, "voteRate", call.abi_encode())
}

/// Performs a read-only `call` against `contract` and decodes its return data.
pub(crate) async fn read<B, C>(
    link: &ChainLink<B>,
    contract: Address,
    method: &'static str,
    call: C,
) -> Result<C::Return, ContractError>
where
    B: ChainBackend,
    C: SolCall,
{
    let output = link
        .call(&ContractCall::new(contract, method, call.abi_encode()))
        .await?;

    C::abi_decode_returns(&output).map_err(|source| ContractError::Decode { method, source })
}

/// Narrows a `uint256` contract value to `u64`.
pub(crate) fn to_u64(method: &'static str, value: U256) -> Result<u64, ContractError> {
    u64::try_from(value).map_err(|_| ContractError::Overflow { method, value })
}
