/*
 * RPC client module for the node the grid hook is deployed on
 */

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, Bytes, TransactionReceipt, H256, U256};
use std::sync::Arc;

use crate::models::{GridHookError, Result};

/// The node operations the pipelines depend on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;
    async fn get_transaction_count(&self, address: Address) -> Result<U256>;
    async fn get_gas_price(&self) -> Result<U256>;
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256>;
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256>;
    async fn get_transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>>;
    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes>;
    async fn get_balance(&self, address: Address) -> Result<U256>;
}

pub struct RpcClient {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
}

impl RpcClient {
    pub async fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| GridHookError::RpcError(format!("Failed to create provider: {e}")))?;

        let chain = provider
            .get_chainid()
            .await
            .map_err(|e| GridHookError::RpcError(format!("Failed to get chain ID: {e}")))?;

        if chain.as_u64() != chain_id {
            return Err(GridHookError::RpcError(format!(
                "Chain ID mismatch: expected {}, got {}",
                chain_id,
                chain.as_u64()
            )));
        }

        Ok(Self {
            provider: Arc::new(provider),
            chain_id,
        })
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256> {
        self.provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| GridHookError::RpcError(format!("Failed to get nonce: {e}")))
    }

    async fn get_gas_price(&self) -> Result<U256> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| GridHookError::RpcError(format!("Failed to get gas price: {e}")))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        self.provider
            .estimate_gas(tx, None)
            .await
            .map_err(|e| GridHookError::RpcError(format!("Gas estimation failed: {e}")))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| GridHookError::RpcError(format!("Failed to send transaction: {e}")))?;
        Ok(pending.tx_hash())
    }

    async fn get_transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| GridHookError::RpcError(format!("Failed to get receipt: {e}")))
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes> {
        self.provider
            .call(tx, None)
            .await
            .map_err(|e| GridHookError::RpcError(format!("eth_call failed: {e}")))
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| GridHookError::RpcError(format!("Failed to get balance: {e}")))
    }
}
