//! Lifecycle of the sync loops.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chain_link::{ChainBackend, ChainLink, ConfirmationWatcher};
use futures::future::join_all;
use stake_relay_contracts::{StakeManager, StakePortalRate};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::SchedulerConfig,
    era_sync::EraSyncEngine,
    errors::{StartError, SyncError},
    metrics::MetricsSink,
    rate_sync::RateSyncEngine,
    supervisor::spawn_supervised,
};

/// Primary chains the relay is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryNetwork {
    /// Ethereum mainnet.
    Mainnet,

    /// Goerli testnet.
    Goerli,

    /// Sepolia testnet.
    Sepolia,
}

impl PrimaryNetwork {
    /// Maps a chain id to a supported network.
    pub const fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(PrimaryNetwork::Mainnet),
            5 => Some(PrimaryNetwork::Goerli),
            11_155_111 => Some(PrimaryNetwork::Sepolia),
            _ => None,
        }
    }

    /// Whether this is a test network.
    pub const fn is_dev(&self) -> bool {
        !matches!(self, PrimaryNetwork::Mainnet)
    }
}

/// One unit of periodic work.
#[async_trait]
pub trait SyncTask: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Runs one cycle.
    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError>;
}

/// Runs `task` every `period` until `cancel` fires.
///
/// The first cycle starts one period after the call. A failed cycle is logged and reported, and
/// the loop moves on to the next tick.
pub async fn run_loop(
    task: Arc<dyn SyncTask>,
    period: Duration,
    cancel: CancellationToken,
    sink: Arc<dyn MetricsSink>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(task = %task.name(), ?period, "sync loop started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match task.run_cycle(&cancel).await {
            Ok(()) => sink.heartbeat().await,
            Err(SyncError::Cancelled) => break,
            Err(err) => {
                let code = err.code();
                warn!(task = %task.name(), %code, %err, "sync cycle failed");
                sink.report_error(code, &err.to_string()).await;
            }
        }
    }

    info!(task = %task.name(), "sync loop stopped");
}

/// Owns the chain links, the contracts and the stop signal of a relay.
///
/// Dropping the scheduler stops its loops.
pub struct TaskScheduler<M, R, PB, SB> {
    config: SchedulerConfig,
    primary: Arc<ChainLink<PB>>,
    secondary: Arc<ChainLink<SB>>,
    stake_manager: Arc<M>,
    portal: Arc<R>,
    sink: Arc<dyn MetricsSink>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    started: bool,
}

impl<M, R, PB, SB> std::fmt::Debug for TaskScheduler<M, R, PB, SB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("config", &self.config)
            .field("primary", &self.primary)
            .field("secondary", &self.secondary)
            .field("started", &self.started)
            .field("stopped", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<M, R, PB, SB> TaskScheduler<M, R, PB, SB>
where
    M: StakeManager,
    R: StakePortalRate,
    PB: ChainBackend,
    SB: ChainBackend,
{
    /// Creates a scheduler. Nothing runs until [`Self::start`] is called.
    pub fn new(
        config: SchedulerConfig,
        primary: Arc<ChainLink<PB>>,
        secondary: Arc<ChainLink<SB>>,
        stake_manager: Arc<M>,
        portal: Arc<R>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            primary,
            secondary,
            stake_manager,
            portal,
            sink,
            cancel: CancellationToken::new(),
            handles: Vec::new(),
            started: false,
        }
    }

    /// Checks the startup preconditions and launches the loops selected by the configured mode.
    ///
    /// Returns as soon as the loops are spawned.
    pub async fn start(&mut self) -> Result<(), StartError> {
        if self.cancel.is_cancelled() {
            return Err(StartError::Stopped);
        }
        if self.started {
            return Err(StartError::AlreadyStarted);
        }
        if self.config.task_interval.is_zero() {
            return Err(StartError::ZeroTaskInterval);
        }

        let chain_id = self.primary.validate().await?;
        let network =
            PrimaryNetwork::from_chain_id(chain_id).ok_or(StartError::UnsupportedChain(chain_id))?;
        info!(?network, %chain_id, dev = %network.is_dev(), "primary network");

        self.secondary.validate().await?;

        let pools = self.stake_manager.bonded_pools().await?;
        if pools.is_empty() {
            return Err(StartError::NoBondedPools);
        }
        info!(bonded_pools = %pools.len(), mode = ?self.config.mode, "starting sync loops");

        if self.config.mode.runs_era_sync() {
            let engine = EraSyncEngine::new(
                self.stake_manager.clone(),
                self.primary.clone(),
                ConfirmationWatcher::new(self.config.primary_confirmation),
                self.config.era_execution,
            );
            self.spawn_loop("era-sync", Arc::new(engine));
        }

        if self.config.mode.runs_rate_sync() {
            let engine = RateSyncEngine::new(
                self.stake_manager.clone(),
                self.portal.clone(),
                self.secondary.clone(),
                ConfirmationWatcher::new(self.config.secondary_confirmation),
                self.config.proposal_execution,
            );
            self.spawn_loop("rate-sync", Arc::new(engine));
        }

        self.started = true;
        Ok(())
    }

    fn spawn_loop(&mut self, name: &'static str, task: Arc<dyn SyncTask>) {
        let period = self.config.task_interval;
        let cancel = self.cancel.clone();
        let sink = self.sink.clone();

        let handle = spawn_supervised(
            name,
            self.cancel.clone(),
            self.config.restart_delay,
            move || run_loop(task.clone(), period, cancel.clone(), sink.clone()),
        );
        self.handles.push(handle);
    }
}

impl<M, R, PB, SB> TaskScheduler<M, R, PB, SB> {
    /// Signals every loop to stop. Only the first call has an effect.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            info!("stopping sync loops");
            self.cancel.cancel();
        }
    }

    /// Whether [`Self::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the loops and waits up to `timeout` for them to exit.
    ///
    /// Returns `false` if some loop was still running when the timeout elapsed.
    pub async fn shutdown(mut self, timeout: Duration) -> bool {
        self.stop();

        let handles = std::mem::take(&mut self.handles);
        match tokio::time::timeout(timeout, join_all(handles)).await {
            Ok(_) => {
                info!("sync loops stopped");
                true
            }
            Err(_) => {
                warn!(?timeout, "sync loops did not stop in time");
                false
            }
        }
    }
}

impl<M, R, PB, SB> Drop for TaskScheduler<M, R, PB, SB> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
