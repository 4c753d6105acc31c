// src/blockchain/nonce_manager.rs

use std::sync::Arc;

use dashmap::DashMap;
use ethers_core::types::{Address, U256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::blockchain::client::ChainRpc;

// Tracks the next nonce per (chain id, sender) so back-to-back broadcasts do
// not reuse a nonce the node has not yet reflected in its pending count.
#[derive(Debug, Default)]
pub struct NonceManager {
    // The DashMap allows concurrent access to different (chain, address) states.
    nonces: DashMap<(u64, Address), Arc<Mutex<NonceState>>>,
}

#[derive(Debug, Default)]
struct NonceState {
    next_nonce: Option<U256>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, chain_id: u64, address: Address) -> Arc<Mutex<NonceState>> {
        self.nonces
            .entry((chain_id, address))
            .or_insert_with(|| Arc::new(Mutex::new(NonceState::default())))
            .clone()
    }

    /// Next nonce to use: the node's pending count, or the local
    /// expectation when that is ahead of the node.
    pub async fn next_nonce(
        &self,
        rpc: &dyn ChainRpc,
        chain_id: u64,
        address: Address,
    ) -> anyhow::Result<U256> {
        let state = self.state(chain_id, address);
        let state = state.lock().await;

        let on_chain = rpc.transaction_count(address).await?;
        let nonce = match state.next_nonce {
            Some(local) if local > on_chain => local,
            _ => on_chain,
        };
        debug!(chain_id, %address, %nonce, "nonce selected");
        Ok(nonce)
    }

    /// Records a nonce the node accepted.
    pub async fn mark_broadcast(&self, chain_id: u64, address: Address, nonce: U256) {
        let state = self.state(chain_id, address);
        let mut state = state.lock().await;
        let next = nonce + U256::one();
        if state.next_nonce.map_or(true, |current| next > current) {
            state.next_nonce = Some(next);
        }
    }
}
