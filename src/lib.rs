#![recursion_limit = "256"]
// src/lib.rs

// Re-export commonly used types
pub use ethers::types::{Address, H256, U256};

// Re-export modules
pub mod aggregator;
pub mod api;
pub mod blockchain;
pub mod config;
pub mod mcp;
pub mod utils;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// The agent's wallet: session, signing clients and route orchestrator
    pub wallet: blockchain::AgentWallet,
}
