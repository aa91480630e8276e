use std::{path::PathBuf, time::Duration};

use alloy_primitives::Address;
use chain_link::{ChainError, GasPolicy, RetryPolicy};
use serde::{Deserialize, Serialize};
use sync_tracker::{constants::DEFAULT_TASK_INTERVAL, SchedulerConfig, SyncMode};

use crate::constants::DEFAULT_SHUTDOWN_TIMEOUT;

/// The configuration values that dictate the behavior of the relay.
///
/// Both chain sections are required whatever mode the relay runs in: the era loop only talks to
/// the primary chain, but startup validates both links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Period of the sync loops, in seconds.
    #[serde(default = "default_task_interval_secs")]
    pub task_interval_secs: u64,

    /// How long to wait for the loops to exit on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,

    /// Number of runtime worker threads.
    pub num_threads: Option<u8>,

    /// Polling of `latestEra` after a `newEra` transaction is mined.
    pub era_execution: Option<RetryPolicy>,

    /// Polling of a voted proposal.
    pub proposal_execution: Option<RetryPolicy>,

    /// The chain hosting the `StakeManager`.
    pub primary: ChainConfig,

    /// The chain hosting the `StakePortalRate`.
    pub secondary: ChainConfig,

    /// The signing identity, shared by both chains.
    pub signer: SignerConfig,

    /// Gas bounds, shared by both chains.
    pub gas: GasConfig,

    /// Where to push heartbeats and errors. Nothing is pushed when absent.
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChainConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: String,

    /// Address of the staking contract on this chain.
    pub contract: Address,

    /// Receipt polling override.
    pub confirmation: Option<RetryPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SignerConfig {
    /// File containing the hex-encoded private key.
    pub key_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GasConfig {
    /// Gas limit of `newEra` and upper bound of estimated `voteRate` gas.
    pub gas_limit: u64,

    /// Highest gas price, in wei, the relay will sign with.
    pub max_gas_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MetricsConfig {
    /// Base URL of the push gateway.
    pub push_gateway: String,

    /// Job label.
    pub job: String,
}

impl Config {
    pub(crate) fn gas_policy(&self) -> Result<GasPolicy, ChainError> {
        GasPolicy::new(self.gas.gas_limit, u128::from(self.gas.max_gas_price))
    }

    pub(crate) fn scheduler_config(&self, mode: SyncMode) -> SchedulerConfig {
        let defaults = SchedulerConfig::default();

        SchedulerConfig {
            mode,
            task_interval: Duration::from_secs(self.task_interval_secs),
            era_execution: self.era_execution.unwrap_or(defaults.era_execution),
            proposal_execution: self
                .proposal_execution
                .unwrap_or(defaults.proposal_execution),
            primary_confirmation: self
                .primary
                .confirmation
                .unwrap_or(defaults.primary_confirmation),
            secondary_confirmation: self
                .secondary
                .confirmation
                .unwrap_or(defaults.secondary_confirmation),
            restart_delay: defaults.restart_delay,
        }
    }
}

const fn default_task_interval_secs() -> u64 {
    DEFAULT_TASK_INTERVAL.as_secs()
}

const fn default_shutdown_timeout() -> Duration {
    DEFAULT_SHUTDOWN_TIMEOUT
}
