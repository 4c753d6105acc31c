//! Wallet session: the single holder of the account's signing capability.
//!
//! The session owns one client binding per configured chain and a
//! lock-guarded "current chain" pointer. Every operation that switches chain,
//! reads the signing client and broadcasts runs under [`WalletSession::lock`],
//! so no other switch can interleave with it.

use std::collections::HashMap;
use std::sync::Arc;

use ethers::types::{Address, U256};
use ethers_signers::{LocalWallet, Signer};
use futures::future::join_all;
use k256::ecdsa::SigningKey;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::blockchain::{
    client::{ChainClientBinding, ChainRpc, RpcConnector, SigningClient},
    evm_client::HttpConnector,
    models::{WalletError, WalletResult},
    nonce_manager::NonceManager,
    registry::{ChainDescriptor, ChainKey, ChainRegistry},
};

/// Parses a hex private key (with or without `0x`) into a local wallet.
pub fn parse_secret_key(secret_key: &str) -> WalletResult<LocalWallet> {
    let trimmed = secret_key.trim();
    let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = Zeroizing::new(
        hex::decode(hex_key)
            .map_err(|_| WalletError::InvalidCredential("private key is not valid hex".into()))?,
    );
    if bytes.len() != 32 {
        return Err(WalletError::InvalidCredential(format!(
            "private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let signing_key = SigningKey::from_slice(&bytes)
        .map_err(|e| WalletError::InvalidCredential(e.to_string()))?;
    Ok(LocalWallet::from(signing_key))
}

pub struct WalletSession {
    address: Address,
    registry: Arc<ChainRegistry>,
    bindings: Arc<HashMap<ChainKey, ChainClientBinding>>,
    current: Arc<Mutex<ChainKey>>,
}

impl WalletSession {
    /// Builds HTTP clients for every chain in `registry`.
    pub fn initialize(secret_key: &SecretString, registry: ChainRegistry) -> WalletResult<Self> {
        Self::initialize_with(secret_key, registry, &HttpConnector::default())
    }

    pub fn initialize_with(
        secret_key: &SecretString,
        registry: ChainRegistry,
        connector: &dyn RpcConnector,
    ) -> WalletResult<Self> {
        let wallet = parse_secret_key(secret_key.expose_secret())?;
        let address = wallet.address();
        let current = registry
            .default_chain()
            .cloned()
            .ok_or_else(|| WalletError::UnknownChain("no chains configured".into()))?;

        let nonces = Arc::new(NonceManager::new());
        let mut bindings = HashMap::new();
        for (key, descriptor) in registry.iter() {
            match connector.connect(key, descriptor) {
                Ok(query) => {
                    let signer = SigningClient::new(
                        key.clone(),
                        descriptor.chain_id,
                        wallet.clone(),
                        query.clone(),
                        nonces.clone(),
                    );
                    bindings.insert(
                        key.clone(),
                        ChainClientBinding {
                            descriptor: descriptor.clone(),
                            query,
                            signer,
                        },
                    );
                }
                Err(e) => {
                    warn!("Failed to create clients for chain {}: {:#}", key, e);
                }
            }
        }

        info!(
            "Wallet session ready for {:?} on {} chain(s), current chain {}",
            address,
            bindings.len(),
            current
        );

        Ok(Self {
            address,
            registry: Arc::new(registry),
            bindings: Arc::new(bindings),
            current: Arc::new(Mutex::new(current)),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Takes the session for one logical operation.
    pub async fn lock(&self) -> SessionGuard {
        SessionGuard {
            current: self.current.clone().lock_owned().await,
            address: self.address,
            registry: self.registry.clone(),
            bindings: self.bindings.clone(),
        }
    }

    pub async fn current_chain(&self) -> ChainKey {
        self.current.lock().await.clone()
    }

    pub async fn switch_chain(&self, key: &ChainKey) -> WalletResult<()> {
        self.lock().await.switch_chain(key)
    }

    /// Native balance on the current chain; `None` when the node gave no data.
    pub async fn balance(&self) -> Option<U256> {
        self.lock().await.balance().await
    }

    /// Best-effort native balance on every connected chain.
    pub async fn balances(&self) -> Vec<(ChainKey, Option<U256>)> {
        let address = self.address;
        let queries = self.registry.keys().map(|key| {
            let binding = self.bindings.get(key);
            async move {
                let balance = match binding {
                    Some(binding) => best_effort_balance(binding, address).await,
                    None => None,
                };
                (key.clone(), balance)
            }
        });
        join_all(queries).await
    }

    pub fn query_client(&self, key: &ChainKey) -> WalletResult<Arc<dyn ChainRpc>> {
        query_client(&self.registry, &self.bindings, key)
    }

    pub async fn signing_client(&self) -> WalletResult<SigningClient> {
        self.lock().await.signing_client()
    }
}

/// Exclusive access to the session's current chain for one operation.
pub struct SessionGuard {
    current: OwnedMutexGuard<ChainKey>,
    address: Address,
    registry: Arc<ChainRegistry>,
    bindings: Arc<HashMap<ChainKey, ChainClientBinding>>,
}

impl SessionGuard {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn current_chain(&self) -> &ChainKey {
        &self.current
    }

    /// Points the session at `key`. Switching to the current chain is a no-op;
    /// an unknown key leaves the current chain untouched.
    pub fn switch_chain(&mut self, key: &ChainKey) -> WalletResult<()> {
        self.registry.resolve(key)?;
        if *self.current == *key {
            return Ok(());
        }
        debug!("Switching chain {} -> {}", *self.current, key);
        *self.current = key.clone();
        Ok(())
    }

    /// Switches by numeric chain id.
    pub fn switch_to_chain_id(&mut self, chain_id: u64) -> WalletResult<()> {
        let key = self
            .registry
            .find_by_chain_id(chain_id)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| WalletError::UnknownChain(format!("chain id {}", chain_id)))?;
        self.switch_chain(&key)
    }

    pub fn descriptor(&self) -> WalletResult<&ChainDescriptor> {
        self.registry.resolve(&self.current)
    }

    pub fn signing_client(&self) -> WalletResult<SigningClient> {
        self.bindings
            .get(&*self.current)
            .map(|binding| binding.signer.clone())
            .ok_or_else(|| WalletError::NotConnected(self.current.to_string()))
    }

    pub fn query_client(&self, key: &ChainKey) -> WalletResult<Arc<dyn ChainRpc>> {
        query_client(&self.registry, &self.bindings, key)
    }

    pub async fn balance(&self) -> Option<U256> {
        let binding = self.bindings.get(&*self.current)?;
        best_effort_balance(binding, self.address).await
    }
}

fn query_client(
    registry: &ChainRegistry,
    bindings: &HashMap<ChainKey, ChainClientBinding>,
    key: &ChainKey,
) -> WalletResult<Arc<dyn ChainRpc>> {
    registry.resolve(key)?;
    bindings
        .get(key)
        .map(|binding| binding.query.clone())
        .ok_or_else(|| WalletError::NotConnected(key.to_string()))
}

async fn best_effort_balance(binding: &ChainClientBinding, address: Address) -> Option<U256> {
    match binding.query.balance(address).await {
        Ok(balance) => Some(balance),
        Err(e) => {
            warn!(
                "Balance query on {} failed: {:#}",
                binding.descriptor.name, e
            );
            None
        }
    }
}
