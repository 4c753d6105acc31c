//! Swap and bridge orchestration on top of the route aggregator.
//!
//! The orchestrator validates the request, checks the source balance, asks
//! the aggregator for routes, selects one and executes it while holding the
//! session lock. The aggregator signs through [`SessionSigner`], which hands
//! out the locked session's signing clients and never the key itself.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use tokio::sync::Mutex;
use tracing::{info, warn};
use validator::Validate;

use crate::aggregator::{
    types::{RouteExecution, RoutesRequest},
    ExecutionOptions, ExecutionSigner, FirstRoute, RouteAggregator, RouteSelector,
};
use crate::blockchain::{
    client::SigningClient,
    models::{
        validate_evm_address, BridgeParams, SwapParams, TransactionResult, WalletError,
        WalletResult,
    },
    registry::ChainKey,
    services::{
        token,
        transactions::{ensure_balance, parse_address},
    },
    session::{SessionGuard, WalletSession},
    units,
};

/// Execution signer backed by a locked wallet session.
pub struct SessionSigner {
    guard: Mutex<SessionGuard>,
}

impl SessionSigner {
    pub fn new(guard: SessionGuard) -> Self {
        Self {
            guard: Mutex::new(guard),
        }
    }
}

#[async_trait]
impl ExecutionSigner for SessionSigner {
    async fn current_signer(&self) -> WalletResult<SigningClient> {
        self.guard.lock().await.signing_client()
    }

    async fn switch_chain(&self, chain_id: u64) -> WalletResult<SigningClient> {
        let mut guard = self.guard.lock().await;
        guard.switch_to_chain_id(chain_id)?;
        info!("Route execution switched session to {}", guard.current_chain());
        guard.signing_client()
    }
}

/// One normalized swap or bridge request.
struct RouteIntent<'a> {
    from_chain: ChainKey,
    to_chain: ChainKey,
    from_token: Address,
    to_token: Address,
    amount: &'a str,
    to_address: Option<Address>,
    slippage_bps: u32,
}

fn same_asset(a: &Address, b: &Address) -> bool {
    a == b || (token::is_native_token(a) && token::is_native_token(b))
}

pub struct RouteOrchestrator {
    aggregator: Arc<dyn RouteAggregator>,
    selector: Arc<dyn RouteSelector>,
    options: ExecutionOptions,
}

impl RouteOrchestrator {
    pub fn new(aggregator: Arc<dyn RouteAggregator>) -> Self {
        Self {
            aggregator,
            selector: Arc::new(FirstRoute),
            options: ExecutionOptions::default(),
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn RouteSelector>) -> Self {
        self.selector = selector;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn selector(&self) -> &dyn RouteSelector {
        self.selector.as_ref()
    }

    /// Same-chain token swap.
    pub async fn swap(
        &self,
        session: &WalletSession,
        params: &SwapParams,
    ) -> WalletResult<TransactionResult> {
        params.validate()?;
        let from_token = parse_address("from_token", &params.from_token)?;
        let to_token = parse_address("to_token", &params.to_token)?;
        if same_asset(&from_token, &to_token) {
            return Err(WalletError::InvalidParameter(
                "from_token and to_token must differ".into(),
            ));
        }
        let chain = session.registry().resolve_key(&params.chain)?;

        self.run(
            session,
            RouteIntent {
                from_chain: chain.clone(),
                to_chain: chain,
                from_token,
                to_token,
                amount: &params.amount,
                to_address: None,
                slippage_bps: params.slippage_bps(),
            },
        )
        .await
    }

    /// Cross-chain transfer, optionally to another recipient.
    pub async fn bridge(
        &self,
        session: &WalletSession,
        params: &BridgeParams,
    ) -> WalletResult<TransactionResult> {
        params.validate()?;
        let from_token = parse_address("from_token", &params.from_token)?;
        let to_token = parse_address("to_token", &params.to_token)?;
        let to_address = match params.to_address.as_deref() {
            Some(address) => {
                validate_evm_address(address).map_err(|e| {
                    WalletError::InvalidParameter(format!(
                        "to_address: {}",
                        e.message.unwrap_or_default()
                    ))
                })?;
                Some(parse_address("to_address", address)?)
            }
            None => None,
        };
        let from_chain = session.registry().resolve_key(&params.from_chain)?;
        let to_chain = session.registry().resolve_key(&params.to_chain)?;
        if from_chain == to_chain && same_asset(&from_token, &to_token) {
            return Err(WalletError::InvalidParameter(
                "bridge needs a different chain or token".into(),
            ));
        }

        self.run(
            session,
            RouteIntent {
                from_chain,
                to_chain,
                from_token,
                to_token,
                amount: &params.amount,
                to_address,
                slippage_bps: params.slippage_bps(),
            },
        )
        .await
    }

    async fn run(
        &self,
        session: &WalletSession,
        intent: RouteIntent<'_>,
    ) -> WalletResult<TransactionResult> {
        let mut guard = session.lock().await;
        guard.switch_chain(&intent.from_chain)?;
        let descriptor = guard.descriptor()?.clone();
        let to_chain_id = guard.registry().resolve(&intent.to_chain)?.chain_id;
        let signer = guard.signing_client()?;
        let rpc = signer.rpc().clone();
        let sender = signer.address();

        let chain_name = intent.from_chain.to_string();
        let rpc_error = |e: anyhow::Error| WalletError::Rpc {
            chain: chain_name.clone(),
            detail: format!("{:#}", e),
        };

        let decimals = if token::is_native_token(&intent.from_token) {
            descriptor.native_currency.decimals
        } else {
            token::erc20_decimals(rpc.as_ref(), intent.from_token)
                .await
                .map_err(rpc_error)?
        };
        let amount = units::parse_positive_amount(intent.amount, decimals)?;
        let available = token::token_balance(rpc.as_ref(), intent.from_token, sender)
            .await
            .map_err(rpc_error)?;
        ensure_balance(&guard, amount, available)?;

        let request = RoutesRequest {
            from_chain_id: descriptor.chain_id,
            to_chain_id,
            from_token_address: to_checksum(&intent.from_token, None),
            to_token_address: to_checksum(&intent.to_token, None),
            from_amount: amount.to_string(),
            from_address: to_checksum(&sender, None),
            to_address: intent.to_address.map(|a| to_checksum(&a, None)),
            slippage_bps: intent.slippage_bps,
        };
        info!(
            "Requesting routes {} -> {} for {} ({} bps slippage)",
            intent.from_chain, intent.to_chain, amount, intent.slippage_bps
        );

        let routes = self
            .aggregator
            .get_routes(&request)
            .await
            .map_err(|e| WalletError::Aggregator(format!("{:#}", e)))?;
        let no_route = || {
            WalletError::NoRouteFound(format!(
                "{} {:?} -> {} {:?}",
                intent.from_chain, intent.from_token, intent.to_chain, intent.to_token
            ))
        };
        if routes.is_empty() {
            return Err(no_route());
        }
        let route = self.selector.select(&routes).ok_or_else(no_route)?;
        info!(
            "Selected {} using '{}' out of {} route(s)",
            route,
            self.selector.name(),
            routes.len()
        );

        let target = route
            .approval_address()
            .and_then(|a| a.parse::<Address>().ok());
        let signer = SessionSigner::new(guard);
        let execution = self
            .aggregator
            .execute_route(route, &signer, &self.options)
            .await
            .map_err(|e| WalletError::ExecutionFailed {
                status: "ERROR".into(),
                detail: format!("{:#}", e),
            })?;

        to_transaction_result(execution, sender, target, amount, descriptor.chain_id)
    }
}

fn to_transaction_result(
    execution: RouteExecution,
    sender: Address,
    target: Option<Address>,
    amount: U256,
    chain_id: u64,
) -> WalletResult<TransactionResult> {
    let first = execution
        .steps
        .first()
        .ok_or_else(|| WalletError::ExecutionFailed {
            status: "ERROR".into(),
            detail: format!("route {} executed no steps", execution.route_id),
        })?;
    for step in &execution.steps {
        if let Some(failed) = step.failure() {
            warn!(
                "Route {} failed at step {} ({:?})",
                execution.route_id, step.step_id, failed.kind
            );
            return Err(WalletError::ExecutionFailed {
                status: failed.status.to_string(),
                detail: failed.message.clone().unwrap_or_default(),
            });
        }
    }
    let hash = first
        .tx_hash()
        .map(str::to_string)
        .ok_or_else(|| WalletError::ExecutionFailed {
            status: first
                .result()
                .map(|p| p.status.to_string())
                .unwrap_or_else(|| "ERROR".into()),
            detail: format!("step {} reported no transaction hash", first.step_id),
        })?;

    let step_tx = first.transaction_request.as_ref();
    let to = target
        .map(|a| to_checksum(&a, None))
        .or_else(|| step_tx.map(|tx| tx.to.clone()))
        .unwrap_or_default();

    Ok(TransactionResult {
        hash,
        from: to_checksum(&sender, None),
        to,
        value: amount.to_string(),
        data: step_tx.map(|tx| tx.data.clone()).filter(|d| !d.is_empty()),
        chain_id,
    })
}
