//! Waits for submitted transactions to be mined.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    backend::ChainBackend,
    errors::WatchError,
    link::ChainLink,
    policy::{sleep_unless_cancelled, RetryPolicy},
    types::{InclusionOutcome, TxHash, TxStatus},
};

/// Polls a chain for the inclusion of a transaction with a bounded retry budget.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationWatcher {
    policy: RetryPolicy,
}

impl ConfirmationWatcher {
    /// Creates a watcher that polls according to `policy`.
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The retry policy of this watcher.
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Waits until `tx_hash` is mined on `link`.
    ///
    /// Lookup errors, unknown transactions and pending transactions all count as one attempt.
    /// A mined transaction returns immediately with its execution outcome. When the budget runs
    /// out the link's local nonce is resynced, since the transaction may have been dropped.
    pub async fn await_inclusion<B: ChainBackend>(
        &self,
        link: &ChainLink<B>,
        tx_hash: TxHash,
        cancel: &CancellationToken,
    ) -> Result<InclusionOutcome, WatchError> {
        let max_attempts = self.policy.max_attempts();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(WatchError::Cancelled(tx_hash));
            }

            match link.transaction_status(tx_hash).await {
                Ok(TxStatus::Mined { success: true }) => return Ok(InclusionOutcome::Success),
                Ok(TxStatus::Mined { success: false }) => return Ok(InclusionOutcome::Reverted),
                Ok(status) => {
                    debug!(link = %link.name(), %tx_hash, ?status, %attempt, "not mined yet");
                }
                Err(err) => {
                    warn!(link = %link.name(), %tx_hash, %attempt, %err, "lookup failed");
                }
            }

            if attempt < max_attempts && !sleep_unless_cancelled(self.policy.interval, cancel).await
            {
                return Err(WatchError::Cancelled(tx_hash));
            }
        }

        warn!(link = %link.name(), %tx_hash, attempts = %max_attempts, "transaction not mined");
        link.resync_nonce().await;

        Err(WatchError::RetryExhausted {
            tx_hash,
            attempts: max_attempts,
            ceiling: self.policy.ceiling,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_primitives::Address;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        errors::ChainError,
        policy::GasPolicy,
        test_backend::FakeBackend,
        types::{ContractCall, GasLimit, TxOptions},
    };

    fn link(backend: FakeBackend) -> ChainLink<FakeBackend> {
        ChainLink::new("test", backend, GasPolicy::new(1_000_000, 100).unwrap()).unwrap()
    }

    fn watcher() -> ConfirmationWatcher {
        ConfirmationWatcher::new(RetryPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(10),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn never_mined_transaction_exhausts_the_budget() {
        let backend = FakeBackend::default();
        backend.script_statuses([Ok(TxStatus::Unknown)], TxStatus::Pending);
        let link = link(backend.clone());

        let started = Instant::now();
        let err = watcher()
            .await_inclusion(&link, TxHash::ZERO, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::RetryExhausted { attempts: 5, .. }));
        assert_eq!(backend.status_lookups(), 5);
        // four sleeps between five attempts
        assert_eq!(started.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_transaction_frees_its_nonce() {
        let backend = FakeBackend::default();
        let link = link(backend.clone());
        let call = ContractCall::new(Address::repeat_byte(0xaa), "newEra", vec![0x7c]);

        let tx_hash = link.submit(&call, GasLimit::Configured).await.unwrap();
        let err = watcher()
            .await_inclusion(&link, tx_hash, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::RetryExhausted { .. }));

        // the node's pending nonce never moved past the dropped transaction
        link.submit(&call, GasLimit::Configured).await.unwrap();
        link.submit(&call, GasLimit::Configured).await.unwrap();

        let nonces: Vec<u64> = backend.sent().iter().map(TxOptions::nonce).collect();
        assert_eq!(nonces, vec![0, 0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_errors_are_retried_until_mined() {
        let backend = FakeBackend::default();
        backend.script_statuses(
            [
                Err(ChainError::rpc("eth_getTransactionReceipt", "timeout")),
                Ok(TxStatus::Pending),
                Ok(TxStatus::Mined { success: true }),
            ],
            TxStatus::Pending,
        );
        let link = link(backend.clone());

        let outcome = watcher()
            .await_inclusion(&link, TxHash::ZERO, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, InclusionOutcome::Success);
        assert_eq!(backend.status_lookups(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_transaction_is_reported() {
        let backend = FakeBackend::default();
        backend.script_statuses(
            Vec::<Result<TxStatus, ChainError>>::new(),
            TxStatus::Mined { success: false },
        );
        let link = link(backend);

        let outcome = watcher()
            .await_inclusion(&link, TxHash::ZERO, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, InclusionOutcome::Reverted);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let backend = FakeBackend::default();
        let link = link(backend.clone());
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let err = watcher()
            .await_inclusion(&link, TxHash::ZERO, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::Cancelled(_)));
        assert!(started.elapsed() <= Duration::from_secs(4));
        assert_eq!(backend.status_lookups(), 2);
    }
}
