// src/blockchain/mod.rs

pub mod agent_wallet;
pub mod client;
pub mod evm_client;
pub mod models;
pub mod nonce_manager;
pub mod registry;
pub mod services;
pub mod session;
pub mod units;

pub use agent_wallet::AgentWallet;
pub use client::{ChainRpc, RpcConnector, SigningClient};
pub use evm_client::{EvmClient, HttpConnector};
pub use models::{WalletError, WalletResult};
pub use registry::{ChainDescriptor, ChainKey, ChainRegistry};
pub use session::{SessionGuard, WalletSession};

// Re-export commonly used types
pub use ethers::{
    types::{Address, H256, U256},
    utils::to_checksum,
};
