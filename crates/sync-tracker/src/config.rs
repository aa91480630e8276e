//! Runtime configuration of the scheduler.

use std::time::Duration;

use chain_link::RetryPolicy;

use crate::constants::{
    DEFAULT_TASK_INTERVAL, ERA_EXECUTION_CEILING, ERA_EXECUTION_POLL_INTERVAL,
    PRIMARY_CONFIRMATION, PROPOSAL_EXECUTION_CEILING, PROPOSAL_EXECUTION_POLL_INTERVAL,
    RESTART_DELAY, SECONDARY_CONFIRMATION,
};

/// Which sync loops the scheduler runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Both the era loop and the rate loop.
    #[default]
    All,

    /// Only the era loop.
    NewEra,

    /// Only the rate loop.
    SyncRate,
}

impl SyncMode {
    /// Whether the era loop runs in this mode.
    pub const fn runs_era_sync(&self) -> bool {
        matches!(self, SyncMode::All | SyncMode::NewEra)
    }

    /// Whether the rate loop runs in this mode.
    pub const fn runs_rate_sync(&self) -> bool {
        matches!(self, SyncMode::All | SyncMode::SyncRate)
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Loops to run.
    pub mode: SyncMode,

    /// Period between two cycles of a loop.
    pub task_interval: Duration,

    /// Polling of `latestEra` after `newEra` is mined.
    pub era_execution: RetryPolicy,

    /// Polling of a proposal after the vote is mined.
    pub proposal_execution: RetryPolicy,

    /// Receipt polling on the primary chain.
    pub primary_confirmation: RetryPolicy,

    /// Receipt polling on the secondary chain.
    pub secondary_confirmation: RetryPolicy,

    /// Delay before a panicked loop is restarted.
    pub restart_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            task_interval: DEFAULT_TASK_INTERVAL,
            era_execution: RetryPolicy::new(ERA_EXECUTION_POLL_INTERVAL, ERA_EXECUTION_CEILING),
            proposal_execution: RetryPolicy::new(
                PROPOSAL_EXECUTION_POLL_INTERVAL,
                PROPOSAL_EXECUTION_CEILING,
            ),
            primary_confirmation: PRIMARY_CONFIRMATION,
            secondary_confirmation: SECONDARY_CONFIRMATION,
            restart_delay: RESTART_DELAY,
        }
    }
}
