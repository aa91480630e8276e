//! Timing and protocol constants.

use std::time::Duration;

use chain_link::RetryPolicy;

/// Period of the sync loops.
pub const DEFAULT_TASK_INTERVAL: Duration = Duration::from_secs(15);

/// How often `latestEra` is polled after a `newEra` transaction is mined.
pub const ERA_EXECUTION_POLL_INTERVAL: Duration = Duration::from_secs(12);

/// How long to wait for `latestEra` to reach the submitted era.
pub const ERA_EXECUTION_CEILING: Duration = Duration::from_secs(2 * 60 * 60);

/// How often a voted proposal is polled for execution.
pub const PROPOSAL_EXECUTION_POLL_INTERVAL: Duration = Duration::from_secs(6);

/// How long to wait for a voted proposal to be executed.
pub const PROPOSAL_EXECUTION_CEILING: Duration = Duration::from_secs(30 * 60);

/// Receipt polling on the primary chain.
pub const PRIMARY_CONFIRMATION: RetryPolicy =
    RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(2 * 60));

/// Receipt polling on the secondary chain.
pub const SECONDARY_CONFIRMATION: RetryPolicy =
    RetryPolicy::new(Duration::from_secs(6), Duration::from_secs(30 * 60));

/// Delay before a panicked loop is restarted.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Method tag embedded in rate proposal ids.
pub const VOTE_RATE_TAG: &str = "voteRate";

/// Factor embedded in rate proposal ids.
pub const RATE_VOTE_FACTOR: u64 = 0;
