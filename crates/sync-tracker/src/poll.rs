//! Polling of application-level post-conditions.

use std::{fmt, future::Future};

use chain_link::{sleep_unless_cancelled, RetryPolicy};
use stake_relay_contracts::ContractError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::SyncError;

/// Reads a value with `probe` until `done` accepts it or the retry budget runs out.
///
/// Read errors are logged and count as an attempt. Returns `Ok(None)` when the budget is exhausted
/// and [`SyncError::Cancelled`] if `cancel` fires first.
pub async fn poll_until<T, F, Fut, D>(
    what: &'static str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut probe: F,
    done: D,
) -> Result<Option<T>, SyncError>
where
    T: fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ContractError>>,
    D: Fn(&T) -> bool,
{
    let max_attempts = policy.max_attempts();

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        match probe().await {
            Ok(value) if done(&value) => return Ok(Some(value)),
            Ok(value) => debug!(%what, ?value, %attempt, "condition not met yet"),
            Err(err) => warn!(%what, %attempt, %err, "poll read failed"),
        }

        if attempt < max_attempts && !sleep_unless_cancelled(policy.interval, cancel).await {
            return Err(SyncError::Cancelled);
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use chain_link::ChainError;
    use tokio::time::Instant;

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn returns_the_first_accepted_value() {
        let reads = AtomicU32::new(0);
        let reads = &reads;
        let probe = move || async move {
            let n = reads.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                return Err(ContractError::from(ChainError::rpc("latestEra", "timeout")));
            }
            Ok(n)
        };

        let cancel = CancellationToken::new();
        let value = poll_until("counter", &policy(), &cancel, probe, |n| *n >= 3)
            .await
            .unwrap();

        assert_eq!(value, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_budget() {
        let started = Instant::now();
        let value = poll_until(
            "never",
            &policy(),
            &CancellationToken::new(),
            || async { Ok::<_, ContractError>(0u32) },
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(value, None);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let probe = || async { Ok::<_, ContractError>(0u32) };
        let res = poll_until("never", &policy(), &cancel, probe, |_| false).await;
        assert!(matches!(res, Err(SyncError::Cancelled)));
    }
}
