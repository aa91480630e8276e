//! Votes the primary exchange rate onto the secondary chain.

use std::sync::Arc;

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use chain_link::{
    ChainBackend, ChainLink, ConfirmationWatcher, GasLimit, InclusionOutcome, RetryPolicy, TxHash,
};
use stake_relay_contracts::{ProposalStatus, StakeManager, StakePortalRate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    constants::RATE_VOTE_FACTOR, errors::SyncError, poll::poll_until, proposal::proposal_id,
    scheduler::SyncTask,
};

/// Result of one rate sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSyncOutcome {
    /// Both chains report the same rate.
    InSync,

    /// The proposal for this era and rate was already executed.
    AlreadyExecuted {
        /// The proposal id.
        proposal_id: B256,
    },

    /// The proposal is in a state this relay does not vote on.
    ProposalRejected {
        /// The proposal id.
        proposal_id: B256,
        /// The raw status read from the contract.
        status: u8,
    },

    /// This relay already voted on the proposal.
    AlreadyVoted {
        /// The proposal id.
        proposal_id: B256,
    },

    /// A vote was cast and the proposal got executed.
    Voted {
        /// The proposal id.
        proposal_id: B256,
        /// The rate voted for.
        rate: U256,
        /// The `voteRate` transaction.
        tx_hash: TxHash,
    },
}

/// Propagates the `StakeManager` rate to the `StakePortalRate` by voting on a proposal whose id is
/// derived from the latest era and the rate.
#[derive(Debug)]
pub struct RateSyncEngine<M, R, B> {
    stake_manager: Arc<M>,
    portal: Arc<R>,
    link: Arc<ChainLink<B>>,
    watcher: ConfirmationWatcher,
    execution: RetryPolicy,
}

impl<M, R, B> RateSyncEngine<M, R, B>
where
    M: StakeManager,
    R: StakePortalRate,
    B: ChainBackend,
{
    /// Creates an engine voting through `link`, which must be connected to the secondary chain.
    pub const fn new(
        stake_manager: Arc<M>,
        portal: Arc<R>,
        link: Arc<ChainLink<B>>,
        watcher: ConfirmationWatcher,
        execution: RetryPolicy,
    ) -> Self {
        Self {
            stake_manager,
            portal,
            link,
            watcher,
            execution,
        }
    }

    /// Runs one cycle.
    pub async fn sync_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RateSyncOutcome, SyncError> {
        let (primary_rate, secondary_rate) =
            tokio::try_join!(self.stake_manager.rate(), self.portal.rate())?;

        if primary_rate == secondary_rate {
            debug!(rate = %primary_rate, "rates in sync");
            return Ok(RateSyncOutcome::InSync);
        }

        let latest = self.stake_manager.latest_era().await?;
        let era = u32::try_from(latest).map_err(|_| SyncError::EraOutOfRange(latest))?;
        let proposal_id = proposal_id(era, primary_rate, RATE_VOTE_FACTOR);

        info!(%era, %primary_rate, %secondary_rate, %proposal_id, "rates diverge");

        let proposal = self.portal.proposal(proposal_id).await?;
        match proposal.status {
            ProposalStatus::Executed => {
                info!(%proposal_id, "proposal already executed");
                return Ok(RateSyncOutcome::AlreadyExecuted { proposal_id });
            }
            ProposalStatus::Rejected(status) => {
                warn!(%proposal_id, %status, "proposal in unexpected state, not voting");
                return Ok(RateSyncOutcome::ProposalRejected {
                    proposal_id,
                    status,
                });
            }
            ProposalStatus::Inactive | ProposalStatus::Active => {}
        }

        if self.portal.has_voted(proposal_id, self.link.sender()).await? {
            info!(%proposal_id, yes_votes = %proposal.yes_votes, "already voted");
            return Ok(RateSyncOutcome::AlreadyVoted { proposal_id });
        }

        let call = self.portal.vote_rate(proposal_id, primary_rate);
        let tx_hash = self.link.submit(&call, GasLimit::Estimate).await?;
        info!(%proposal_id, rate = %primary_rate, %tx_hash, "vote submitted");

        match self.watcher.await_inclusion(&self.link, tx_hash, cancel).await? {
            InclusionOutcome::Success => info!(%tx_hash, "vote mined"),
            InclusionOutcome::Reverted => {
                warn!(%tx_hash, %proposal_id, "vote reverted, waiting for the proposal anyway")
            }
        }

        let executed = poll_until(
            "proposals",
            &self.execution,
            cancel,
            || self.portal.proposal(proposal_id),
            |proposal| proposal.is_executed(),
        )
        .await?;

        match executed {
            Some(_) => {
                info!(%proposal_id, rate = %primary_rate, "proposal executed");
                Ok(RateSyncOutcome::Voted {
                    proposal_id,
                    rate: primary_rate,
                    tx_hash,
                })
            }
            None => Err(SyncError::ProposalTimeout {
                proposal_id,
                waited: self.execution.ceiling,
            }),
        }
    }
}

#[async_trait]
impl<M, R, B> SyncTask for RateSyncEngine<M, R, B>
where
    M: StakeManager,
    R: StakePortalRate,
    B: ChainBackend,
{
    fn name(&self) -> &'static str {
        "rate-sync"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        let outcome = self.sync_once(cancel).await?;
        debug!(?outcome, "rate sync cycle done");
        Ok(())
    }
}
