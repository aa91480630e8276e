//! # `sync-tracker`
//!
//! Keeps the primary `StakeManager` and the secondary `StakePortalRate` consistent.
//!
//! Two engines do the work:
//!
//! - [`EraSyncEngine`](era_sync::EraSyncEngine) advances the primary contract by one era whenever
//!   `currentEra` runs ahead of `latestEra`;
//! - [`RateSyncEngine`](rate_sync::RateSyncEngine) votes the primary rate onto the secondary chain
//!   through a deterministic proposal id.
//!
//! The [`TaskScheduler`](scheduler::TaskScheduler) runs them as independent periodic loops on a
//! shared [`CancellationToken`](tokio_util::sync::CancellationToken), each under a supervisor that
//! restarts it if it panics, and reports heartbeats and coded errors to a
//! [`MetricsSink`](metrics::MetricsSink).

pub mod config;
pub mod constants;
pub mod era_sync;
pub mod errors;
pub mod metrics;
pub mod poll;
pub mod proposal;
pub mod rate_sync;
pub mod scheduler;
pub mod supervisor;

pub use config::{SchedulerConfig, SyncMode};
pub use errors::{StartError, SyncError};
pub use scheduler::{PrimaryNetwork, TaskScheduler};
