//! Consumer-facing wallet facade used by the MCP tools and the HTTP API.

use std::sync::Arc;

use anyhow::Result;
use ethers::utils::to_checksum;
use serde::Serialize;
use tracing::info;

use crate::aggregator::LifiClient;
use crate::blockchain::{
    evm_client::HttpConnector,
    models::{
        BalanceResponse, BridgeParams, SwapParams, TokenTransferParams, TransactionResult,
        TransferParams, WalletError, WalletResult,
    },
    registry::ChainKey,
    services::{balance, routes::RouteOrchestrator, transactions},
    session::WalletSession,
};
use crate::config::Config;

/// One configured chain as shown to consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSummary {
    pub key: String,
    pub chain_id: u64,
    pub name: String,
    pub symbol: String,
    pub explorer: String,
    pub current: bool,
}

#[derive(Clone)]
pub struct AgentWallet {
    session: Arc<WalletSession>,
    orchestrator: Arc<RouteOrchestrator>,
}

impl AgentWallet {
    pub fn new(session: WalletSession, orchestrator: RouteOrchestrator) -> Self {
        Self {
            session: Arc::new(session),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Builds the session, HTTP clients and aggregator from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let secret = config
            .private_key
            .as_ref()
            .ok_or_else(|| WalletError::InvalidCredential("PRIVATE_KEY is not set".into()))?;
        let registry = config.chain_registry()?;
        let session = WalletSession::initialize_with(
            secret,
            registry,
            &HttpConnector::new(config.rpc_timeout),
        )?;

        if let Some(default_chain) = &config.default_chain {
            let key = session.registry().resolve_key(default_chain)?;
            session.switch_chain(&key).await?;
        }

        let aggregator = LifiClient::new(config.aggregator_config())?;
        info!("Route aggregator at {}", config.aggregator_url);
        Ok(Self::new(session, RouteOrchestrator::new(Arc::new(aggregator))))
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// Checksummed account address.
    pub fn address(&self) -> String {
        to_checksum(&self.session.address(), None)
    }

    pub async fn current_chain(&self) -> ChainKey {
        self.session.current_chain().await
    }

    pub async fn chains(&self) -> Vec<ChainSummary> {
        let current = self.session.current_chain().await;
        self.session
            .registry()
            .iter()
            .map(|(key, descriptor)| ChainSummary {
                key: key.to_string(),
                chain_id: descriptor.chain_id,
                name: descriptor.name.clone(),
                symbol: descriptor.native_currency.symbol.clone(),
                explorer: descriptor.block_explorer_url.to_string(),
                current: *key == current,
            })
            .collect()
    }

    /// Explorer link for a transaction sent on a configured chain.
    pub fn explorer_tx_url(&self, chain_id: u64, tx_hash: &str) -> Option<String> {
        self.session
            .registry()
            .find_by_chain_id(chain_id)
            .map(|(_, descriptor)| descriptor.explorer_tx_url(tx_hash))
    }

    /// Switches by key, alias or numeric chain id and returns the resolved key.
    pub async fn switch_chain(&self, chain: &str) -> WalletResult<ChainKey> {
        let key = self.session.registry().resolve_key(chain)?;
        self.session.switch_chain(&key).await?;
        info!("Current chain is now {}", key);
        Ok(key)
    }

    pub async fn balance(&self) -> Option<BalanceResponse> {
        balance::current_balance(&self.session).await
    }

    /// Balance on one chain; switches the session there first.
    pub async fn balance_on(&self, chain: &str) -> WalletResult<Option<BalanceResponse>> {
        let key = self.session.registry().resolve_key(chain)?;
        let balance = balance::chain_balance(&self.session, &key).await?;
        info!("Current chain is now {}", key);
        Ok(balance)
    }

    pub async fn balances(&self) -> Vec<(String, Option<BalanceResponse>)> {
        balance::all_balances(&self.session).await
    }

    pub async fn transfer(&self, params: &TransferParams) -> WalletResult<TransactionResult> {
        transactions::transfer(&self.session, params).await
    }

    pub async fn transfer_token(
        &self,
        params: &TokenTransferParams,
    ) -> WalletResult<TransactionResult> {
        transactions::transfer_token(&self.session, params).await
    }

    pub async fn swap(&self, params: &SwapParams) -> WalletResult<TransactionResult> {
        self.orchestrator.swap(&self.session, params).await
    }

    pub async fn bridge(&self, params: &BridgeParams) -> WalletResult<TransactionResult> {
        self.orchestrator.bridge(&self.session, params).await
    }
}
