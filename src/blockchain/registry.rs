//! Chain registry: static per-chain metadata keyed by a short chain name.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::blockchain::models::{WalletError, WalletResult};

/// Normalized chain identifier such as `ethereum` or `base-sepolia`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChainKey(String);

impl ChainKey {
    /// Lowercases and collapses spaces/underscores into single dashes.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let mut s = raw.as_ref().trim().to_lowercase().replace([' ', '_'], "-");
        while s.contains("--") {
            s = s.replace("--", "-");
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ChainKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ChainKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ChainKey> for String {
    fn from(key: ChainKey) -> Self {
        key.0
    }
}

impl fmt::Display for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub chain_id: u64,
    pub name: String,
    pub native_currency: NativeCurrency,
    pub rpc_url: Url,
    pub block_explorer_url: Url,
}

impl ChainDescriptor {
    /// Explorer link for a transaction hash.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!(
            "{}/tx/{}",
            self.block_explorer_url.as_str().trim_end_matches('/'),
            tx_hash
        )
    }
}

fn builtin_chain(
    chain_id: u64,
    name: &str,
    symbol: &str,
    rpc_url: &str,
    explorer: &str,
) -> ChainDescriptor {
    ChainDescriptor {
        chain_id,
        name: name.to_string(),
        native_currency: NativeCurrency {
            name: "Ether".to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
        },
        rpc_url: Url::parse(rpc_url).expect("built-in rpc url is valid"),
        block_explorer_url: Url::parse(explorer).expect("built-in explorer url is valid"),
    }
}

lazy_static! {
    static ref BUILTIN_CHAINS: BTreeMap<ChainKey, ChainDescriptor> = {
        let mut chains = BTreeMap::new();
        chains.insert(
            ChainKey::new("ethereum"),
            builtin_chain(1, "Ethereum", "ETH", "https://cloudflare-eth.com", "https://etherscan.io"),
        );
        chains.insert(
            ChainKey::new("sepolia"),
            builtin_chain(
                11155111,
                "Sepolia",
                "SEP",
                "https://rpc.sepolia.org",
                "https://sepolia.etherscan.io",
            ),
        );
        chains.insert(
            ChainKey::new("base"),
            builtin_chain(8453, "Base", "ETH", "https://mainnet.base.org", "https://basescan.org"),
        );
        chains.insert(
            ChainKey::new("base-sepolia"),
            builtin_chain(
                84532,
                "Base Sepolia",
                "ETH",
                "https://sepolia.base.org",
                "https://sepolia.basescan.org",
            ),
        );
        chains
    };
}

/// Immutable set of configured chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainKey, ChainDescriptor>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ChainRegistry {
    /// Ethereum mainnet, Sepolia, Base and Base Sepolia.
    pub fn builtin() -> Self {
        Self {
            chains: BUILTIN_CHAINS.clone(),
        }
    }

    /// Replaces the built-in table entirely.
    pub fn from_chains(
        chains: impl IntoIterator<Item = (ChainKey, ChainDescriptor)>,
    ) -> WalletResult<Self> {
        let chains: BTreeMap<_, _> = chains.into_iter().collect();
        if chains.is_empty() {
            return Err(WalletError::InvalidParameter(
                "chain configuration must define at least one chain".into(),
            ));
        }
        let mut seen: BTreeMap<u64, &ChainKey> = BTreeMap::new();
        for (key, descriptor) in &chains {
            if let Some(previous) = seen.insert(descriptor.chain_id, key) {
                return Err(WalletError::InvalidParameter(format!(
                    "chains '{}' and '{}' share chain id {}",
                    previous, key, descriptor.chain_id
                )));
            }
        }
        Ok(Self { chains })
    }

    /// Parses a JSON object of `key -> descriptor`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let chains: BTreeMap<ChainKey, ChainDescriptor> = serde_json::from_str(json)?;
        Ok(Self::from_chains(chains)?)
    }

    pub fn resolve(&self, key: &ChainKey) -> WalletResult<&ChainDescriptor> {
        self.chains
            .get(key)
            .ok_or_else(|| WalletError::UnknownChain(key.to_string()))
    }

    /// Maps user input (key, alias or numeric chain id) to a configured key.
    pub fn resolve_key(&self, input: &str) -> WalletResult<ChainKey> {
        let key = ChainKey::new(input);
        if self.chains.contains_key(&key) {
            return Ok(key);
        }
        if let Some(alias) = alias_for(key.as_str()) {
            let alias = ChainKey::new(alias);
            if self.chains.contains_key(&alias) {
                return Ok(alias);
            }
        }
        if let Ok(chain_id) = key.as_str().parse::<u64>() {
            if let Some((found, _)) = self.find_by_chain_id(chain_id) {
                return Ok(found.clone());
            }
        }
        Err(WalletError::UnknownChain(input.to_string()))
    }

    pub fn find_by_chain_id(&self, chain_id: u64) -> Option<(&ChainKey, &ChainDescriptor)> {
        self.chains.iter().find(|(_, d)| d.chain_id == chain_id)
    }

    /// `ethereum` when configured, otherwise the first key.
    pub fn default_chain(&self) -> Option<&ChainKey> {
        let ethereum = ChainKey::new("ethereum");
        self.chains
            .get_key_value(&ethereum)
            .map(|(k, _)| k)
            .or_else(|| self.chains.keys().next())
    }

    pub fn contains(&self, key: &ChainKey) -> bool {
        self.chains.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ChainKey> {
        self.chains.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChainKey, &ChainDescriptor)> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

// Common names users pass for the configured networks.
fn alias_for(key: &str) -> Option<&'static str> {
    match key {
        "mainnet" | "main" | "eth" | "ethereum-mainnet" => Some("ethereum"),
        "base-mainnet" => Some("base"),
        "eth-sepolia" | "ethereum-sepolia" | "testnet" => Some("sepolia"),
        "basesepolia" | "base-testnet" => Some("base-sepolia"),
        _ => None,
    }
}
