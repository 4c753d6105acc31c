// src/blockchain/evm_client.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256, U64};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::blockchain::{
    client::{ChainRpc, RpcConnector},
    registry::{ChainDescriptor, ChainKey},
};

/// Default timeout for a single JSON-RPC round trip.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Plain JSON-RPC 2.0 client for an EVM node.
#[derive(Debug)]
pub struct EvmClient {
    client: Client,
    rpc_url: Url,
    next_id: AtomicU64,
}

impl EvmClient {
    pub fn new(rpc_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            rpc_url,
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        debug!("rpc {} -> {}", method, self.rpc_url);

        let response: Value = self
            .client
            .post(self.rpc_url.clone())
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("{} request to {} failed", method, self.rpc_url))?
            .json()
            .await
            .with_context(|| format!("{} returned a non-JSON body", method))?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("RPC Error calling {}: {}", method, error));
        }
        let result = response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("RPC response for {} missing 'result' field: {}", method, response))?;
        serde_json::from_value(result)
            .with_context(|| format!("Failed to decode {} result", method))
    }
}

#[async_trait]
impl ChainRpc for EvmClient {
    fn endpoint(&self) -> String {
        self.rpc_url.to_string()
    }

    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self.request("eth_chainId", json!([])).await?;
        Ok(id.as_u64())
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.request("eth_getBalance", json!([address, "latest"])).await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256> {
        self.request("eth_estimateGas", json!([tx])).await
    }

    async fn gas_price(&self) -> Result<U256> {
        self.request("eth_gasPrice", json!([])).await
    }

    async fn transaction_count(&self, address: Address) -> Result<U256> {
        self.request("eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        self.request("eth_call", json!([tx, "latest"])).await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        self.request("eth_sendRawTransaction", json!([raw])).await
    }
}

/// Connects every chain to its configured RPC URL over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_RPC_TIMEOUT)
    }
}

impl RpcConnector for HttpConnector {
    fn connect(&self, key: &ChainKey, descriptor: &ChainDescriptor) -> Result<Arc<dyn ChainRpc>> {
        match descriptor.rpc_url.scheme() {
            "http" | "https" => {}
            other => {
                warn!("Unsupported RPC scheme '{}' for chain {}", other, key);
                return Err(anyhow!("unsupported RPC scheme '{}' for chain {}", other, key));
            }
        }
        let client = EvmClient::new(descriptor.rpc_url.clone(), self.timeout)?;
        Ok(Arc::new(client))
    }
}
