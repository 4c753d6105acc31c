//! Per-chain client set.
//!
//! Every configured chain gets a read-only query client ([`ChainRpc`]) and a
//! [`SigningClient`] bound to the session's single account. The signing client
//! signs locally; only the signed envelope ever reaches the node.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, H256, U256,
};
use ethers_signers::{LocalWallet, Signer};

use crate::blockchain::{
    nonce_manager::NonceManager,
    registry::{ChainDescriptor, ChainKey},
};

/// Read-only JSON-RPC access to one chain plus raw broadcast.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Endpoint description used in log lines and error context.
    fn endpoint(&self) -> String;

    async fn chain_id(&self) -> Result<u64>;

    async fn balance(&self, address: Address) -> Result<U256>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256>;

    async fn gas_price(&self) -> Result<U256>;

    /// Transaction count including pending transactions.
    async fn transaction_count(&self, address: Address) -> Result<U256>;

    /// `eth_call` against the latest block.
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256>;
}

/// Builds the query client for a chain.
pub trait RpcConnector: Send + Sync {
    fn connect(&self, key: &ChainKey, descriptor: &ChainDescriptor) -> Result<Arc<dyn ChainRpc>>;
}

/// Account-bound signer for one chain.
#[derive(Clone)]
pub struct SigningClient {
    chain: ChainKey,
    wallet: LocalWallet,
    rpc: Arc<dyn ChainRpc>,
    nonces: Arc<NonceManager>,
}

impl fmt::Debug for SigningClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningClient")
            .field("chain", &self.chain)
            .field("chain_id", &self.wallet.chain_id())
            .field("address", &self.wallet.address())
            .field("endpoint", &self.rpc.endpoint())
            .finish_non_exhaustive()
    }
}

impl SigningClient {
    pub fn new(
        chain: ChainKey,
        chain_id: u64,
        wallet: LocalWallet,
        rpc: Arc<dyn ChainRpc>,
        nonces: Arc<NonceManager>,
    ) -> Self {
        Self {
            chain,
            wallet: wallet.with_chain_id(chain_id),
            rpc,
            nonces,
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn chain(&self) -> &ChainKey {
        &self.chain
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }

    pub fn rpc(&self) -> &Arc<dyn ChainRpc> {
        &self.rpc
    }

    pub fn nonces(&self) -> &NonceManager {
        &self.nonces
    }

    /// Signs a fully populated transaction and returns the RLP envelope.
    ///
    /// The chain id is forced to this client's chain so a transaction can
    /// never be signed for a different network than the one it is sent to.
    pub async fn sign(&self, tx: TransactionRequest) -> Result<Bytes> {
        let typed: TypedTransaction = tx.chain_id(self.chain_id()).into();
        let signature = self.wallet.sign_transaction(&typed).await?;
        Ok(typed.rlp_signed(&signature))
    }
}

/// Descriptor plus both clients for one chain.
#[derive(Clone)]
pub struct ChainClientBinding {
    pub descriptor: ChainDescriptor,
    pub query: Arc<dyn ChainRpc>,
    pub signer: SigningClient,
}

impl fmt::Debug for ChainClientBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClientBinding")
            .field("descriptor", &self.descriptor)
            .field("signer", &self.signer)
            .finish()
    }
}
