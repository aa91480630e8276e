//! Per-chain access with serialized transaction submission.

use std::fmt;

use alloy_primitives::{Address, Bytes};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    backend::ChainBackend,
    errors::ChainError,
    policy::GasPolicy,
    types::{ContractCall, GasLimit, TxHash, TxOptions, TxStatus},
};

/// Signing state that must only be touched while holding the submission lock.
#[derive(Debug, Default)]
struct SignerState {
    /// Nonce to use for the next transaction, if one has been sent through this link.
    next_nonce: Option<u64>,
}

/// A single chain seen through a single signing identity.
///
/// Reads go straight to the backend and may run concurrently. Writes go through
/// [`ChainLink::submit`], which holds an async mutex from nonce selection until the node has
/// accepted or rejected the transaction, so two tasks can never sign with the same nonce.
pub struct ChainLink<B> {
    name: String,
    backend: B,
    sender: Address,
    policy: GasPolicy,
    state: Mutex<SignerState>,
}

impl<B> fmt::Debug for ChainLink<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLink")
            .field("name", &self.name)
            .field("sender", &self.sender)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<B: ChainBackend> ChainLink<B> {
    /// Creates a new link named `name` (used in logs) over `backend`.
    ///
    /// Fails if the backend's signer is the zero address.
    pub fn new(name: impl Into<String>, backend: B, policy: GasPolicy) -> Result<Self, ChainError> {
        let sender = backend.signer_address();
        if sender == Address::ZERO {
            return Err(ChainError::InvalidConfig(
                "signer address is the zero address".to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            backend,
            sender,
            policy,
            state: Mutex::new(SignerState::default()),
        })
    }

    /// The name this link was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address every transaction from this link is signed with.
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// The gas bounds applied to submissions.
    pub const fn policy(&self) -> &GasPolicy {
        &self.policy
    }

    /// Access to the underlying backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The chain id reported by the node.
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        self.backend.chain_id().await
    }

    /// Checks that the node is reachable and that the signer can obtain a nonce and a gas price
    /// within policy.
    ///
    /// Returns the chain id on success.
    pub async fn validate(&self) -> Result<u64, ChainError> {
        let chain_id = self.backend.chain_id().await?;
        let nonce = self.backend.pending_nonce(self.sender).await?;
        let gas_price = self.backend.gas_price().await?;

        if gas_price > self.policy.max_gas_price() {
            warn!(
                link = %self.name,
                %gas_price,
                max_gas_price = %self.policy.max_gas_price(),
                "node gas price is above the configured maximum, submissions will be capped"
            );
        }

        info!(link = %self.name, %chain_id, sender = %self.sender, %nonce, "chain link validated");

        Ok(chain_id)
    }

    /// Executes a read-only contract call.
    pub async fn call(&self, call: &ContractCall) -> Result<Bytes, ChainError> {
        self.backend.call(call).await
    }

    /// Looks up the inclusion status of a transaction.
    pub async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, ChainError> {
        self.backend.transaction_status(tx_hash).await
    }

    /// Forgets the locally tracked nonce so the next submission starts from the node's pending
    /// nonce.
    ///
    /// Needed when a broadcast transaction never mined: if the node dropped it, the local counter
    /// is ahead of the chain and every later transaction would sit behind a nonce gap.
    pub async fn resync_nonce(&self) {
        let mut state = self.state.lock().await;
        if let Some(stale) = state.next_nonce.take() {
            info!(link = %self.name, %stale, "local nonce cleared, following the node");
        }
    }

    /// Signs and broadcasts `call`.
    ///
    /// The nonce is the larger of the node's pending nonce and the one tracked locally; it is only
    /// advanced once the node accepts the transaction. Gas price follows the node suggestion,
    /// capped at the policy maximum.
    pub async fn submit(
        &self,
        call: &ContractCall,
        gas_limit: GasLimit,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().await;

        let chain_nonce = self.backend.pending_nonce(self.sender).await?;
        let nonce = state
            .next_nonce
            .map_or(chain_nonce, |local| local.max(chain_nonce));

        let suggested = self.backend.gas_price().await?;
        let gas_price = self.policy.cap_gas_price(suggested);
        if gas_price < suggested {
            warn!(link = %self.name, %suggested, capped = %gas_price, "gas price capped");
        }

        let gas_limit = match gas_limit {
            GasLimit::Configured => self.policy.gas_limit(),
            GasLimit::Estimate => {
                let estimated = self.backend.estimate_gas(call, self.sender).await?;
                self.policy.cap_gas_limit(estimated)
            }
        };

        let options = TxOptions {
            from: self.sender,
            nonce,
            gas_price,
            gas_limit,
        };
        debug!(link = %self.name, method = call.method(), ?options, "submitting transaction");

        let tx_hash = self.backend.send_transaction(call, &options).await?;
        state.next_nonce = Some(nonce + 1);

        info!(link = %self.name, method = call.method(), %nonce, %tx_hash, "transaction broadcast");

        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use alloy_primitives::address;

    use super::*;
    use crate::test_backend::FakeBackend;

    const TARGET: Address = address!("0x00000000000000000000000000000000000000aa");

    fn call() -> ContractCall {
        ContractCall::new(TARGET, "newEra", vec![0x7c, 0x1c, 0x8a, 0x53])
    }

    fn link(backend: FakeBackend) -> ChainLink<FakeBackend> {
        let policy = GasPolicy::new(2_000_000, 100).expect("valid policy");
        ChainLink::new("test", backend, policy).expect("valid link")
    }

    #[test]
    fn zero_signer_is_rejected() {
        let backend = FakeBackend::with_signer(Address::ZERO);
        let policy = GasPolicy::new(1, 1).expect("valid policy");
        assert!(ChainLink::new("test", backend, policy).is_err());
    }

    #[tokio::test]
    async fn nonces_advance_when_the_node_lags() {
        stake_relay_common::logging::init_for_tests();

        let backend = FakeBackend::default();
        backend.set_chain_nonce(7);
        let link = link(backend.clone());

        link.submit(&call(), GasLimit::Configured).await.unwrap();
        link.submit(&call(), GasLimit::Configured).await.unwrap();

        let nonces: Vec<u64> = backend.sent().iter().map(TxOptions::nonce).collect();
        assert_eq!(nonces, vec![7, 8]);

        // the node catches up and overtakes the local counter
        backend.set_chain_nonce(12);
        link.submit(&call(), GasLimit::Configured).await.unwrap();
        assert_eq!(backend.sent().last().map(TxOptions::nonce), Some(12));
    }

    #[tokio::test]
    async fn failed_broadcast_does_not_consume_a_nonce() {
        let backend = FakeBackend::default();
        let link = link(backend.clone());

        backend.fail_next_sends(1);
        let err = link.submit(&call(), GasLimit::Configured).await.unwrap_err();
        assert!(matches!(err, ChainError::Broadcast { .. }));

        link.submit(&call(), GasLimit::Configured).await.unwrap();
        assert_eq!(backend.sent().len(), 1);
        assert_eq!(backend.sent()[0].nonce(), 0);
    }

    #[tokio::test]
    async fn gas_is_bounded_by_policy() {
        let backend = FakeBackend::default();
        backend.set_gas_price(500);
        backend.set_estimate(5_000_000);
        let link = link(backend.clone());

        link.submit(&call(), GasLimit::Configured).await.unwrap();
        link.submit(&call(), GasLimit::Estimate).await.unwrap();

        let sent = backend.sent();
        assert!(sent.iter().all(|opts| opts.gas_price() == 100));
        assert!(sent.iter().all(|opts| opts.gas_limit() == 2_000_000));

        backend.set_estimate(60_000);
        link.submit(&call(), GasLimit::Estimate).await.unwrap();
        assert_eq!(backend.sent().last().map(TxOptions::gas_limit), Some(60_000));
    }

    #[tokio::test]
    async fn dropped_transaction_nonce_is_reused_after_resync() {
        let backend = FakeBackend::default();
        let link = link(backend.clone());

        link.submit(&call(), GasLimit::Configured).await.unwrap();
        // the node never saw the first transaction mine and forgot it
        link.resync_nonce().await;
        link.submit(&call(), GasLimit::Configured).await.unwrap();

        let nonces: Vec<u64> = backend.sent().iter().map(TxOptions::nonce).collect();
        assert_eq!(nonces, vec![0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_submissions_are_serialized() {
        let backend = FakeBackend::default();
        backend.set_send_delay(Duration::from_secs(1));
        let link = Arc::new(link(backend.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let link = link.clone();
                tokio::spawn(async move { link.submit(&call(), GasLimit::Configured).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(backend.max_in_flight(), 1);

        let mut nonces: Vec<u64> = backend.sent().iter().map(TxOptions::nonce).collect();
        nonces.sort_unstable();
        assert_eq!(nonces, vec![0, 1, 2, 3]);
    }
}
