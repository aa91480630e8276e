//! In-memory backend for the unit tests of this crate.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy_primitives::{address, Address, Bytes, B256};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    backend::ChainBackend,
    errors::ChainError,
    types::{ContractCall, TxHash, TxOptions, TxStatus},
};

const SIGNER: Address = address!("0x1111111111111111111111111111111111111111");

#[derive(Debug)]
struct State {
    signer: Address,
    chain_nonce: u64,
    gas_price: u128,
    estimate: u64,
    failing_sends: u32,
    send_delay: Duration,
    sent: Vec<TxOptions>,
    statuses: VecDeque<Result<TxStatus, ChainError>>,
    settled_status: TxStatus,
    status_lookups: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeBackend {
    state: Arc<Mutex<State>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::with_signer(SIGNER)
    }
}

impl FakeBackend {
    pub(crate) fn with_signer(signer: Address) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                signer,
                chain_nonce: 0,
                gas_price: 10,
                estimate: 50_000,
                failing_sends: 0,
                send_delay: Duration::ZERO,
                sent: Vec::new(),
                statuses: VecDeque::new(),
                settled_status: TxStatus::Pending,
                status_lookups: 0,
            })),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock())
    }

    pub(crate) fn set_chain_nonce(&self, nonce: u64) {
        self.with_state(|s| s.chain_nonce = nonce);
    }

    pub(crate) fn set_gas_price(&self, price: u128) {
        self.with_state(|s| s.gas_price = price);
    }

    pub(crate) fn set_estimate(&self, gas: u64) {
        self.with_state(|s| s.estimate = gas);
    }

    pub(crate) fn set_send_delay(&self, delay: Duration) {
        self.with_state(|s| s.send_delay = delay);
    }

    pub(crate) fn fail_next_sends(&self, count: u32) {
        self.with_state(|s| s.failing_sends = count);
    }

    /// Queues status responses, returned in order before falling back to `settled`.
    pub(crate) fn script_statuses(
        &self,
        script: impl IntoIterator<Item = Result<TxStatus, ChainError>>,
        settled: TxStatus,
    ) {
        self.with_state(|s| {
            s.statuses = script.into_iter().collect();
            s.settled_status = settled;
        });
    }

    pub(crate) fn sent(&self) -> Vec<TxOptions> {
        self.with_state(|s| s.sent.clone())
    }

    pub(crate) fn status_lookups(&self) -> u32 {
        self.with_state(|s| s.status_lookups)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainBackend for FakeBackend {
    fn signer_address(&self) -> Address {
        self.with_state(|s| s.signer)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(1)
    }

    async fn call(&self, _call: &ContractCall) -> Result<Bytes, ChainError> {
        Ok(Bytes::new())
    }

    async fn pending_nonce(&self, _address: Address) -> Result<u64, ChainError> {
        Ok(self.with_state(|s| s.chain_nonce))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.with_state(|s| s.gas_price))
    }

    async fn estimate_gas(&self, _call: &ContractCall, _from: Address) -> Result<u64, ChainError> {
        Ok(self.with_state(|s| s.estimate))
    }

    async fn send_transaction(
        &self,
        call: &ContractCall,
        options: &TxOptions,
    ) -> Result<TxHash, ChainError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.with_state(|s| s.send_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.with_state(|s| {
            if s.failing_sends > 0 {
                s.failing_sends -= 1;
                return Err(ChainError::broadcast(call.method(), "nonce too low"));
            }

            s.sent.push(*options);
            Ok(B256::left_padding_from(&(s.sent.len() as u64).to_be_bytes()))
        })
    }

    async fn transaction_status(&self, _tx_hash: TxHash) -> Result<TxStatus, ChainError> {
        self.with_state(|s| {
            s.status_lookups += 1;
            s.statuses.pop_front().unwrap_or(Ok(s.settled_status))
        })
    }
}
