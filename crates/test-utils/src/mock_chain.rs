//! In-memory chain implementing the backend and contract seams.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use chain_link::{
    ChainBackend, ChainError, ChainLink, ContractCall, GasPolicy, TxHash, TxOptions, TxStatus,
};
use parking_lot::Mutex;
use stake_relay_contracts::{
    abi::IStakePortalRate, calls, ContractError, Proposal, ProposalStatus, StakeManager,
    StakePortalRate,
};

/// Address the mock `StakeManager` lives at.
pub const STAKE_MANAGER_ADDRESS: Address = address!("0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a");

/// Address the mock `StakePortalRate` lives at.
pub const PORTAL_ADDRESS: Address = address!("0x7b7b7b7b7b7b7b7b7b7b7b7b7b7b7b7b7b7b7b7b");

const DEFAULT_SIGNER: Address = address!("0x1111111111111111111111111111111111111111");

/// A transaction accepted by the mock chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    /// Hash handed back to the sender.
    pub tx_hash: TxHash,
    /// Contract method name.
    pub method: &'static str,
    /// Options the transaction was signed with.
    pub options: TxOptions,
    /// Whether execution reverts once mined.
    pub reverted: bool,
}

/// A rate proposal stored by the mock portal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockProposal {
    /// Raw status value as the contract would return it.
    pub status: u8,
    /// Addresses that voted.
    pub voters: HashSet<Address>,
}

/// State of the mock chain. Fields are public so tests can arrange and inspect it directly.
#[derive(Debug)]
pub struct MockState {
    /// Chain id reported by the node.
    pub chain_id: u64,
    /// Signer of every link built on this chain.
    pub signer: Address,

    /// `StakeManager.currentEra()`.
    pub current_era: u64,
    /// `StakeManager.latestEra()`.
    pub latest_era: u64,
    /// Values returned by the next `latestEra()` reads, ahead of [`Self::latest_era`].
    pub latest_era_overrides: VecDeque<u64>,
    /// Number of `latestEra()` reads so far.
    pub latest_era_reads: u32,
    /// When set, `newEra` transactions are accepted but do not advance the era.
    pub freeze_eras: bool,
    /// `StakeManager.getRate()`.
    pub primary_rate: U256,
    /// `StakeManager.getBondedPools()`.
    pub bonded_pools: Vec<Address>,

    /// `StakePortalRate.getRate()`.
    pub secondary_rate: U256,
    /// Proposals by id.
    pub proposals: HashMap<B256, MockProposal>,
    /// Votes needed to execute a proposal.
    pub vote_threshold: usize,
    /// When set, rate reads on both contracts fail.
    pub fail_rate_reads: bool,

    /// Pending nonce of the signer.
    pub nonce: u64,
    /// Suggested gas price.
    pub gas_price: u128,
    /// Gas estimate returned for every call.
    pub gas_estimate: u64,
    /// Status lookups that report a transaction as pending before it is mined.
    pub pending_polls: u32,
    /// When set, transactions stay pending forever and have no effect.
    pub never_mine: bool,
    /// When set, accepted transactions revert and have no effect.
    pub revert: bool,
    /// Number of upcoming broadcasts to reject.
    pub failing_sends: u32,
    /// Accepted transactions, in order.
    pub sent: Vec<SentTx>,
    /// Status lookups per transaction.
    pub status_lookups: HashMap<TxHash, u32>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            chain_id: 1,
            signer: DEFAULT_SIGNER,
            current_era: 0,
            latest_era: 0,
            latest_era_overrides: VecDeque::new(),
            latest_era_reads: 0,
            freeze_eras: false,
            primary_rate: U256::from(1_000_000u64),
            bonded_pools: vec![Address::repeat_byte(0xaa)],
            secondary_rate: U256::from(1_000_000u64),
            proposals: HashMap::new(),
            vote_threshold: 1,
            fail_rate_reads: false,
            nonce: 0,
            gas_price: 30_000_000_000,
            gas_estimate: 80_000,
            pending_polls: 0,
            never_mine: false,
            revert: false,
            failing_sends: 0,
            sent: Vec::new(),
            status_lookups: HashMap::new(),
        }
    }
}

impl MockState {
    fn apply(&mut self, call: &ContractCall) {
        match call.method() {
            "newEra" if !self.freeze_eras => self.latest_era += 1,
            "voteRate" => {
                let Ok(vote) = IStakePortalRate::voteRateCall::abi_decode(call.input()) else {
                    return;
                };

                let signer = self.signer;
                let threshold = self.vote_threshold;
                let proposal = self.proposals.entry(vote.proposalId).or_default();
                proposal.voters.insert(signer);
                proposal.status = 1;

                if proposal.voters.len() >= threshold {
                    proposal.status = 2;
                    self.secondary_rate = vote.rate;
                }
            }
            _ => {}
        }
    }
}

/// Shared handle to an in-memory chain.
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<MockState>>,
}

impl MockChain {
    /// Creates a chain with default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to the chain state.
    pub fn with<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        f(&mut self.state.lock())
    }

    /// Sets both era counters.
    pub fn set_eras(&self, current: u64, latest: u64) {
        self.with(|s| {
            s.current_era = current;
            s.latest_era = latest;
        });
    }

    /// Sets the primary and secondary rates.
    pub fn set_rates(&self, primary: u64, secondary: u64) {
        self.with(|s| {
            s.primary_rate = U256::from(primary);
            s.secondary_rate = U256::from(secondary);
        });
    }

    /// Stores a proposal with the given raw status and voters.
    pub fn set_proposal(&self, id: B256, status: u8, voters: impl IntoIterator<Item = Address>) {
        self.with(|s| {
            s.proposals.insert(
                id,
                MockProposal {
                    status,
                    voters: voters.into_iter().collect(),
                },
            );
        });
    }

    /// Accepted transactions, in order.
    pub fn sent(&self) -> Vec<SentTx> {
        self.with(|s| s.sent.clone())
    }

    /// Accepted transactions calling `method`.
    pub fn sent_calls(&self, method: &str) -> usize {
        self.with(|s| s.sent.iter().filter(|tx| tx.method == method).count())
    }

    /// The signer address of links built on this chain.
    pub fn signer(&self) -> Address {
        self.with(|s| s.signer)
    }

    /// Builds a [`ChainLink`] over this chain with a permissive gas policy.
    pub fn link(&self, name: &str) -> Arc<ChainLink<MockChain>> {
        let policy = GasPolicy::new(2_000_000, 500_000_000_000)
            .expect("non-zero gas bounds are a valid policy");
        Arc::new(ChainLink::new(name, self.clone(), policy).expect("mock signer is not zero"))
    }
}

#[async_trait]
impl ChainBackend for MockChain {
    fn signer_address(&self) -> Address {
        self.signer()
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.with(|s| s.chain_id))
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes, ChainError> {
        Err(ChainError::rpc(
            call.method(),
            "mock chain serves reads through its contract interfaces",
        ))
    }

    async fn pending_nonce(&self, _address: Address) -> Result<u64, ChainError> {
        Ok(self.with(|s| s.nonce))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.with(|s| s.gas_price))
    }

    async fn estimate_gas(&self, _call: &ContractCall, _from: Address) -> Result<u64, ChainError> {
        Ok(self.with(|s| s.gas_estimate))
    }

    async fn send_transaction(
        &self,
        call: &ContractCall,
        options: &TxOptions,
    ) -> Result<TxHash, ChainError> {
        self.with(|s| {
            if s.failing_sends > 0 {
                s.failing_sends -= 1;
                return Err(ChainError::broadcast(call.method(), "mock broadcast failure"));
            }

            let tx_hash = B256::left_padding_from(&(s.sent.len() as u64 + 1).to_be_bytes());
            s.sent.push(SentTx {
                tx_hash,
                method: call.method(),
                options: *options,
                reverted: s.revert,
            });
            s.nonce = s.nonce.max(options.nonce() + 1);

            if !s.revert && !s.never_mine {
                s.apply(call);
            }

            Ok(tx_hash)
        })
    }

    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, ChainError> {
        self.with(|s| {
            let Some(tx) = s.sent.iter().find(|tx| tx.tx_hash == tx_hash) else {
                return Ok(TxStatus::Unknown);
            };
            let reverted = tx.reverted;

            let lookups = s.status_lookups.entry(tx_hash).or_default();
            *lookups += 1;

            if s.never_mine || *lookups <= s.pending_polls {
                return Ok(TxStatus::Pending);
            }

            Ok(TxStatus::Mined { success: !reverted })
        })
    }
}

#[async_trait]
impl StakeManager for MockChain {
    async fn current_era(&self) -> Result<u64, ContractError> {
        Ok(self.with(|s| s.current_era))
    }

    async fn latest_era(&self) -> Result<u64, ContractError> {
        Ok(self.with(|s| {
            s.latest_era_reads += 1;
            s.latest_era_overrides
                .pop_front()
                .unwrap_or(s.latest_era)
        }))
    }

    async fn rate(&self) -> Result<U256, ContractError> {
        self.with(|s| {
            if s.fail_rate_reads {
                return Err(ChainError::rpc("getRate", "connection refused").into());
            }
            Ok(s.primary_rate)
        })
    }

    async fn bonded_pools(&self) -> Result<Vec<Address>, ContractError> {
        Ok(self.with(|s| s.bonded_pools.clone()))
    }

    fn new_era(&self) -> ContractCall {
        calls::new_era(STAKE_MANAGER_ADDRESS)
    }
}

#[async_trait]
impl StakePortalRate for MockChain {
    async fn rate(&self) -> Result<U256, ContractError> {
        self.with(|s| {
            if s.fail_rate_reads {
                return Err(ChainError::rpc("getRate", "connection refused").into());
            }
            Ok(s.secondary_rate)
        })
    }

    async fn proposal(&self, proposal_id: B256) -> Result<Proposal, ContractError> {
        Ok(self.with(|s| {
            s.proposals
                .get(&proposal_id)
                .map_or(
                    Proposal {
                        status: ProposalStatus::Inactive,
                        yes_votes: 0,
                    },
                    |p| Proposal {
                        status: ProposalStatus::from(p.status),
                        yes_votes: p.voters.len() as u16,
                    },
                )
        }))
    }

    async fn has_voted(&self, proposal_id: B256, voter: Address) -> Result<bool, ContractError> {
        Ok(self.with(|s| {
            s.proposals
                .get(&proposal_id)
                .is_some_and(|p| p.voters.contains(&voter))
        }))
    }

    fn vote_rate(&self, proposal_id: B256, rate: U256) -> ContractCall {
        calls::vote_rate(PORTAL_ADDRESS, proposal_id, rate)
    }
}

#[cfg(test)]
mod tests {
    use chain_link::GasLimit;

    use super::*;

    #[tokio::test]
    async fn votes_execute_at_the_threshold() {
        let chain = MockChain::new();
        chain.with(|s| s.vote_threshold = 1);
        let link = chain.link("secondary");
        let id = B256::repeat_byte(0x42);

        let call = StakePortalRate::vote_rate(&chain, id, U256::from(7u64));
        link.submit(&call, GasLimit::Estimate).await.unwrap();

        let proposal = chain.proposal(id).await.unwrap();
        assert!(proposal.is_executed());
        assert!(chain.has_voted(id, chain.signer()).await.unwrap());
        assert_eq!(StakePortalRate::rate(&chain).await.unwrap(), U256::from(7u64));
    }

    #[tokio::test]
    async fn pending_polls_delay_mining() {
        let chain = MockChain::new();
        chain.with(|s| s.pending_polls = 2);
        let link = chain.link("primary");

        let tx_hash = link
            .submit(&StakeManager::new_era(&chain), GasLimit::Configured)
            .await
            .unwrap();

        assert_eq!(link.transaction_status(tx_hash).await.unwrap(), TxStatus::Pending);
        assert_eq!(link.transaction_status(tx_hash).await.unwrap(), TxStatus::Pending);
        assert_eq!(
            link.transaction_status(tx_hash).await.unwrap(),
            TxStatus::Mined { success: true }
        );
        assert_eq!(chain.with(|s| s.latest_era), 1);
    }
}
