//! [`ChainBackend`] over a JSON-RPC node using `alloy`.

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
};
pub use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use tracing::info;

use crate::{
    backend::ChainBackend,
    errors::ChainError,
    types::{ContractCall, TxHash, TxOptions, TxStatus},
};

/// A node connection with a local signing wallet.
#[derive(Debug, Clone)]
pub struct EvmBackend {
    provider: DynProvider,
    signer_address: Address,
}

impl EvmBackend {
    /// Connects to the node at `rpc_url` and signs with `signer`.
    pub async fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        let signer_address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect(rpc_url)
            .await
            .map_err(|e| ChainError::rpc("connect", e))?
            .erased();

        info!(%rpc_url, signer = %signer_address, "connected to node");

        Ok(Self {
            provider,
            signer_address,
        })
    }

    fn request(call: &ContractCall) -> TransactionRequest {
        TransactionRequest::default()
            .with_to(call.to())
            .with_input(call.input().clone())
    }
}

#[async_trait]
impl ChainBackend for EvmBackend {
    fn signer_address(&self) -> Address {
        self.signer_address
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::rpc("eth_chainId", e))
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes, ChainError> {
        self.provider
            .call(Self::request(call))
            .await
            .map_err(|e| ChainError::rpc(call.method(), e))
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| ChainError::rpc("eth_getTransactionCount", e))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| ChainError::rpc("eth_gasPrice", e))
    }

    async fn estimate_gas(&self, call: &ContractCall, from: Address) -> Result<u64, ChainError> {
        self.provider
            .estimate_gas(Self::request(call).with_from(from))
            .await
            .map_err(|e| ChainError::rpc("eth_estimateGas", e))
    }

    async fn send_transaction(
        &self,
        call: &ContractCall,
        options: &TxOptions,
    ) -> Result<TxHash, ChainError> {
        let request = Self::request(call)
            .with_from(options.from())
            .with_nonce(options.nonce())
            .with_gas_price(options.gas_price())
            .with_gas_limit(options.gas_limit());

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| ChainError::broadcast(call.method(), e))?;

        Ok(*pending.tx_hash())
    }

    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ChainError::rpc("eth_getTransactionReceipt", e))?;

        if let Some(receipt) = receipt {
            return Ok(TxStatus::Mined {
                success: receipt.status(),
            });
        }

        let tx = self
            .provider
            .get_transaction_by_hash(tx_hash)
            .await
            .map_err(|e| ChainError::rpc("eth_getTransactionByHash", e))?;

        Ok(match tx {
            Some(_) => TxStatus::Pending,
            None => TxStatus::Unknown,
        })
    }
}
