//! Gas bounds and retry budgets.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::ChainError;

/// Upper bounds applied to every transaction a [`ChainLink`](crate::ChainLink) signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    gas_limit: u64,
    max_gas_price: u128,
}

impl GasPolicy {
    /// Creates a policy, rejecting zero bounds.
    pub fn new(gas_limit: u64, max_gas_price: u128) -> Result<Self, ChainError> {
        if gas_limit == 0 {
            return Err(ChainError::InvalidConfig("gas limit is zero".to_string()));
        }
        if max_gas_price == 0 {
            return Err(ChainError::InvalidConfig(
                "max gas price is zero".to_string(),
            ));
        }

        Ok(Self {
            gas_limit,
            max_gas_price,
        })
    }

    /// The configured gas limit.
    pub const fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// The highest gas price the link will ever sign with.
    pub const fn max_gas_price(&self) -> u128 {
        self.max_gas_price
    }

    /// Caps a node-suggested gas price at [`Self::max_gas_price`].
    pub fn cap_gas_price(&self, suggested: u128) -> u128 {
        suggested.min(self.max_gas_price)
    }

    /// Caps an estimated gas amount at [`Self::gas_limit`].
    pub fn cap_gas_limit(&self, estimated: u64) -> u64 {
        estimated.min(self.gas_limit)
    }
}

/// A fixed-interval retry budget expressed as a wall-clock ceiling.
///
/// The number of attempts is derived from the ceiling rather than configured directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// The delay between consecutive attempts.
    pub interval: Duration,

    /// How long to keep trying before giving up.
    pub ceiling: Duration,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub const fn new(interval: Duration, ceiling: Duration) -> Self {
        Self { interval, ceiling }
    }

    /// Number of attempts that fit in the ceiling, never less than one.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }

        let attempts = self.ceiling.as_millis() / self.interval.as_millis().max(1);
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

/// Sleeps for `duration` unless `cancel` fires first.
///
/// Returns `false` if the sleep was interrupted by cancellation.
pub async fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_gas_bounds_are_rejected() {
        assert!(GasPolicy::new(0, 1).is_err());
        assert!(GasPolicy::new(1, 0).is_err());
        assert!(GasPolicy::new(2_000_000, 150_000_000_000).is_ok());
    }

    #[test]
    fn gas_price_is_capped() {
        let policy = GasPolicy::new(2_000_000, 100).unwrap();
        assert_eq!(policy.cap_gas_price(99), 99);
        assert_eq!(policy.cap_gas_price(250), 100);
        assert_eq!(policy.cap_gas_limit(3_000_000), 2_000_000);
    }

    #[test]
    fn attempts_follow_the_ceiling() {
        let two_hours = RetryPolicy::new(Duration::from_secs(12), Duration::from_secs(2 * 60 * 60));
        assert_eq!(two_hours.max_attempts(), 600);

        let tiny = RetryPolicy::new(Duration::from_secs(10), Duration::from_secs(1));
        assert_eq!(tiny.max_attempts(), 1);

        let zero_interval = RetryPolicy::new(Duration::ZERO, Duration::from_secs(10));
        assert_eq!(zero_interval.max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_sleep_returns_early() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = tokio::time::Instant::now();
        assert!(!sleep_unless_cancelled(Duration::from_secs(60), &cancel).await);
        assert!(started.elapsed() < Duration::from_secs(1));

        let live = CancellationToken::new();
        assert!(sleep_unless_cancelled(Duration::from_secs(60), &live).await);
    }
}
