//! Advances the primary `StakeManager` when its current era runs ahead of the latest executed one.

use std::sync::Arc;

use async_trait::async_trait;
use chain_link::{
    ChainBackend, ChainLink, ConfirmationWatcher, GasLimit, InclusionOutcome, RetryPolicy, TxHash,
};
use stake_relay_contracts::StakeManager;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{errors::SyncError, poll::poll_until, scheduler::SyncTask};

/// Result of one era sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraSyncOutcome {
    /// `currentEra` equals `latestEra`; nothing to do.
    InSync,

    /// Another relay advanced the era between the two reads of `latestEra`.
    AlreadyAdvanced,

    /// `newEra` was submitted and `latestEra` reached `era`.
    Advanced {
        /// The era that is now the latest.
        era: u64,
        /// The `newEra` transaction.
        tx_hash: TxHash,
    },
}

/// Compares the eras of the primary `StakeManager` and submits `newEra` when they diverge.
#[derive(Debug)]
pub struct EraSyncEngine<M, B> {
    stake_manager: Arc<M>,
    link: Arc<ChainLink<B>>,
    watcher: ConfirmationWatcher,
    execution: RetryPolicy,
}

impl<M, B> EraSyncEngine<M, B>
where
    M: StakeManager,
    B: ChainBackend,
{
    /// Creates an engine submitting through `link`.
    pub const fn new(
        stake_manager: Arc<M>,
        link: Arc<ChainLink<B>>,
        watcher: ConfirmationWatcher,
        execution: RetryPolicy,
    ) -> Self {
        Self {
            stake_manager,
            link,
            watcher,
            execution,
        }
    }

    /// Runs one cycle.
    ///
    /// At most one `newEra` is submitted per cycle, and only if `latestEra` did not move between
    /// the divergence check and the submission. After the transaction is mined, `latestEra` is
    /// polled until it reaches the submitted era, regardless of whether the transaction reverted.
    pub async fn sync_once(&self, cancel: &CancellationToken) -> Result<EraSyncOutcome, SyncError> {
        let current = self.stake_manager.current_era().await?;
        let latest = self.stake_manager.latest_era().await?;

        if current == latest {
            debug!(%current, "eras in sync");
            return Ok(EraSyncOutcome::InSync);
        }

        if latest > current {
            warn!(%current, %latest, "latest era is ahead of current era, skipping");
            return Ok(EraSyncOutcome::InSync);
        }

        let will_use = latest + 1;
        let fresh = self.stake_manager.latest_era().await?;
        if will_use != fresh + 1 {
            info!(%will_use, %fresh, "era already advanced by another relay");
            return Ok(EraSyncOutcome::AlreadyAdvanced);
        }

        info!(%current, %latest, era = %will_use, "submitting newEra");
        let tx_hash = self
            .link
            .submit(&self.stake_manager.new_era(), GasLimit::Configured)
            .await?;

        match self.watcher.await_inclusion(&self.link, tx_hash, cancel).await? {
            InclusionOutcome::Success => info!(%tx_hash, era = %will_use, "newEra mined"),
            InclusionOutcome::Reverted => {
                warn!(%tx_hash, era = %will_use, "newEra reverted, waiting for the era anyway")
            }
        }

        let reached = poll_until(
            "latestEra",
            &self.execution,
            cancel,
            || self.stake_manager.latest_era(),
            |era| *era >= will_use,
        )
        .await?;

        match reached {
            Some(_) => {
                info!(era = %will_use, %tx_hash, "era executed");
                Ok(EraSyncOutcome::Advanced {
                    era: will_use,
                    tx_hash,
                })
            }
            None => Err(SyncError::EraExecutionTimeout {
                era: will_use,
                waited: self.execution.ceiling,
            }),
        }
    }
}

#[async_trait]
impl<M, B> SyncTask for EraSyncEngine<M, B>
where
    M: StakeManager,
    B: ChainBackend,
{
    fn name(&self) -> &'static str {
        "era-sync"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        let outcome = self.sync_once(cancel).await?;
        debug!(?outcome, "era sync cycle done");
        Ok(())
    }
}
