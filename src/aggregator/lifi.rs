//! # LI.FI Client
//!
//! HTTP client for a LI.FI-compatible route aggregation API.
//!
//! # Features
//!
//! - Route discovery (`POST /v1/advanced/routes`)
//! - Per-step transaction building (`POST /v1/advanced/stepTransaction`)
//! - Cross-chain status tracking (`GET /v1/status`)
//! - Exact-amount ERC20 approvals before a step is sent
//!
//! Transactions are always signed locally through the
//! [`ExecutionSigner`] capability.
//!
//! # Examples
//!
//! ```ignore
//! use evm_agent_wallet::aggregator::{LifiClient, LifiConfig};
//!
//! let config = LifiConfig::new()
//!     .with_integrator("my-agent")
//!     .with_timeout_ms(10_000);
//! let client = LifiClient::new(config)?;
//! ```

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::aggregator::{
    types::{
        Process, ProcessKind, ProcessStatus, Route, RouteExecution, RouteStep, RoutesRequest,
        StepExecution, StepTransaction,
    },
    ExecutionOptions, ExecutionSigner, RouteAggregator,
};
use crate::blockchain::{
    client::SigningClient,
    services::{token, transactions::send_evm_transaction},
};

/// Base URL for the public LI.FI API.
pub const DEFAULT_BASE_URL: &str = "https://li.quest";

/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default pause between status checks of a cross-chain transfer.
const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of status checks before giving up on a transfer.
const DEFAULT_MAX_STATUS_POLLS: u32 = 60;

const DEFAULT_INTEGRATOR: &str = "evm-agent-wallet";

const API_KEY_HEADER: &str = "x-lifi-api-key";

/// Configuration for [`LifiClient`].
#[derive(Debug, Clone)]
pub struct LifiConfig {
    base_url: String,
    api_key: Option<String>,
    integrator: String,
    timeout_ms: u64,
    status_poll_interval: Duration,
    max_status_polls: u32,
}

impl Default for LifiConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LifiConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            integrator: DEFAULT_INTEGRATOR.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            status_poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            max_status_polls: DEFAULT_MAX_STATUS_POLLS,
        }
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the API key sent with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the integrator name reported to the aggregator.
    #[must_use]
    pub fn with_integrator(mut self, integrator: impl Into<String>) -> Self {
        self.integrator = integrator.into();
        self
    }

    /// Sets the timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets how cross-chain transfers are polled.
    #[must_use]
    pub fn with_status_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.status_poll_interval = interval;
        self.max_status_polls = max_polls;
        self
    }

    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[inline]
    #[must_use]
    pub fn integrator(&self) -> &str {
        &self.integrator
    }

    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}

#[derive(Debug, Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

/// Cross-chain transfer status reported by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatus {
    pub status: String,
    #[serde(default)]
    pub substatus: Option<String>,
    #[serde(default)]
    pub substatus_message: Option<String>,
}

impl TransferStatus {
    pub fn is_final(&self) -> bool {
        matches!(self.status.as_str(), "DONE" | "FAILED" | "INVALID")
    }

    pub fn is_done(&self) -> bool {
        self.status == "DONE"
    }
}

fn parse_quantity(value: &str) -> Result<U256> {
    match value.strip_prefix("0x") {
        Some(hex_value) => Ok(U256::from_str_radix(hex_value, 16)?),
        None => Ok(U256::from_dec_str(value)?),
    }
}

/// Converts the aggregator's step transaction into a request for local signing.
fn to_transaction_request(tx: &StepTransaction) -> Result<TransactionRequest> {
    let to = Address::from_str(&tx.to).with_context(|| format!("invalid step target '{}'", tx.to))?;
    let mut request = TransactionRequest::new().to(to);
    if !tx.data.is_empty() && tx.data != "0x" {
        request = request.data(Bytes::from_str(&tx.data).context("invalid step calldata")?);
    }
    if let Some(value) = &tx.value {
        request = request.value(parse_quantity(value)?);
    }
    if let Some(gas_limit) = &tx.gas_limit {
        request = request.gas(parse_quantity(gas_limit)?);
    }
    if let Some(gas_price) = &tx.gas_price {
        request = request.gas_price(parse_quantity(gas_price)?);
    }
    Ok(request)
}

/// Returns `(quoted, requoted)` when a re-quote lowers the expected output.
fn worse_rate(original: &RouteStep, updated: &RouteStep) -> Option<(U256, U256)> {
    let quoted = U256::from_dec_str(&original.estimate.to_amount).ok()?;
    let requoted = U256::from_dec_str(&updated.estimate.to_amount).ok()?;
    (requoted < quoted).then_some((quoted, requoted))
}

/// LI.FI-compatible aggregator client.
#[derive(Debug, Clone)]
pub struct LifiClient {
    http: Client,
    config: LifiConfig,
}

impl LifiClient {
    pub fn new(config: LifiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build aggregator HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LifiConfig {
        &self.config
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = self
            .with_auth(builder)
            .send()
            .await
            .with_context(|| format!("{} request failed", what))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} returned {}: {}", what, status, body));
        }
        response
            .json()
            .await
            .with_context(|| format!("{} returned an unexpected body", what))
    }

    /// Asks the aggregator for the signed-ready transaction of `step`.
    pub async fn step_transaction(&self, step: &RouteStep) -> Result<RouteStep> {
        let url = format!("{}/v1/advanced/stepTransaction", self.config.base_url);
        self.send(self.http.post(url).json(step), "stepTransaction")
            .await
    }

    pub async fn transfer_status(&self, step: &RouteStep, tx_hash: &str) -> Result<TransferStatus> {
        let url = format!("{}/v1/status", self.config.base_url);
        let from_chain = step.action.from_chain_id.to_string();
        let to_chain = step.action.to_chain_id.to_string();
        let query = [
            ("txHash", tx_hash),
            ("bridge", step.tool.as_str()),
            ("fromChain", from_chain.as_str()),
            ("toChain", to_chain.as_str()),
        ];
        self.send(self.http.get(url).query(&query), "status").await
    }

    async fn wait_for_completion(&self, step: &RouteStep, tx_hash: &str) -> Result<TransferStatus> {
        for attempt in 1..=self.config.max_status_polls {
            let status = self.transfer_status(step, tx_hash).await?;
            if status.is_final() {
                return Ok(status);
            }
            debug!(attempt, "Transfer {} is {}", tx_hash, status.status);
            tokio::time::sleep(self.config.status_poll_interval).await;
        }
        Err(anyhow!(
            "transfer {} not final after {} status checks",
            tx_hash,
            self.config.max_status_polls
        ))
    }

    /// Approves the step's spender when the current allowance is short.
    async fn ensure_allowance(
        &self,
        signer: &SigningClient,
        step: &RouteStep,
        token_address: Address,
        options: &ExecutionOptions,
    ) -> Result<Option<String>> {
        let spender = Address::from_str(&step.estimate.approval_address)
            .context("invalid approval address")?;
        let amount = U256::from_dec_str(&step.action.from_amount).context("invalid step amount")?;
        let allowance =
            token::erc20_allowance(signer.rpc().as_ref(), token_address, signer.address(), spender)
                .await
                .context("reading allowance")?;
        if allowance >= amount {
            debug!("Allowance {} already covers {}", allowance, amount);
            return Ok(None);
        }

        let approve_amount = if options.infinite_approval { U256::MAX } else { amount };
        info!(
            "Approving {} of {:?} for spender {:?} on {}",
            approve_amount,
            token_address,
            spender,
            signer.chain()
        );
        let tx = TransactionRequest::new()
            .to(token_address)
            .data(token::erc20_approve_data(spender, approve_amount));
        let hash = send_evm_transaction(signer, tx).await.context("sending approval")?;
        Ok(Some(format!("{:?}", hash)))
    }

    async fn execute_step(
        &self,
        step: &RouteStep,
        signer: &dyn ExecutionSigner,
        options: &ExecutionOptions,
    ) -> Result<StepExecution> {
        let from_chain_id = step.action.from_chain_id;
        let mut execution = StepExecution {
            step_id: step.id.clone(),
            chain_id: from_chain_id,
            process: Vec::new(),
            transaction_request: None,
        };
        let kind = if step.is_cross_chain() {
            ProcessKind::CrossChain
        } else {
            ProcessKind::Swap
        };

        let current = signer.current_signer().await?;
        let client = if current.chain_id() == from_chain_id {
            current
        } else {
            info!("Step {} requires chain {}, switching", step.id, from_chain_id);
            signer.switch_chain(from_chain_id).await?
        };

        let from_token = Address::from_str(&step.action.from_token.address)
            .context("invalid source token address")?;
        if !token::is_native_token(&from_token) {
            match self.ensure_allowance(&client, step, from_token, options).await {
                Ok(Some(hash)) => execution
                    .process
                    .push(Process::done(ProcessKind::TokenAllowance, Some(hash))),
                Ok(None) => {}
                Err(e) => {
                    execution
                        .process
                        .push(Process::failed(ProcessKind::TokenAllowance, format!("{:#}", e)));
                    return Ok(execution);
                }
            }
        }

        let updated = match self.step_transaction(step).await {
            Ok(updated) => updated,
            Err(e) => {
                execution.process.push(Process::failed(kind, format!("{:#}", e)));
                return Ok(execution);
            }
        };
        if let Some((quoted, requoted)) = worse_rate(step, &updated) {
            info!(
                "Exchange rate updated for step {}: {} -> {}",
                step.id, quoted, requoted
            );
            if !options.accept_exchange_rate_updates {
                execution.process.push(Process {
                    kind,
                    status: ProcessStatus::Cancelled,
                    tx_hash: None,
                    message: Some(format!(
                        "exchange rate update from {} to {} was not accepted",
                        quoted, requoted
                    )),
                });
                return Ok(execution);
            }
        }

        let Some(step_tx) = updated.transaction_request else {
            execution
                .process
                .push(Process::failed(kind, "aggregator returned no transaction"));
            return Ok(execution);
        };
        execution.transaction_request = Some(step_tx.clone());

        if let Some(tx_chain) = step_tx.chain_id {
            if tx_chain != client.chain_id() {
                execution.process.push(Process::failed(
                    kind,
                    format!("step transaction targets chain {} but signer is on {}", tx_chain, client.chain_id()),
                ));
                return Ok(execution);
            }
        }

        let sent = match to_transaction_request(&step_tx) {
            Ok(tx) => send_evm_transaction(&client, tx).await,
            Err(e) => Err(e),
        };
        match sent {
            Ok(hash) => execution
                .process
                .push(Process::done(kind, Some(format!("{:?}", hash)))),
            Err(e) => {
                warn!("Step {} failed: {:#}", step.id, e);
                execution.process.push(Process::failed(kind, format!("{:#}", e)));
            }
        }
        Ok(execution)
    }
}

#[async_trait]
impl RouteAggregator for LifiClient {
    async fn get_routes(&self, request: &RoutesRequest) -> Result<Vec<Route>> {
        let url = format!("{}/v1/advanced/routes", self.config.base_url);
        let body = json!({
            "fromChainId": request.from_chain_id,
            "toChainId": request.to_chain_id,
            "fromTokenAddress": request.from_token_address,
            "toTokenAddress": request.to_token_address,
            "fromAmount": request.from_amount,
            "fromAddress": request.from_address,
            "toAddress": request.to_address.as_deref().unwrap_or(&request.from_address),
            "options": {
                "slippage": request.slippage_fraction(),
                "integrator": self.config.integrator,
                "order": "RECOMMENDED",
                "allowSwitchChain": request.is_cross_chain(),
            }
        });
        let response: RoutesResponse = self.send(self.http.post(url).json(&body), "routes").await?;
        debug!("Aggregator returned {} route(s)", response.routes.len());
        Ok(response.routes)
    }

    async fn execute_route(
        &self,
        route: Route,
        signer: &dyn ExecutionSigner,
        options: &ExecutionOptions,
    ) -> Result<RouteExecution> {
        let mut execution = RouteExecution {
            route_id: route.id.clone(),
            steps: Vec::with_capacity(route.steps.len()),
        };

        let step_count = route.steps.len();
        for (index, step) in route.steps.iter().enumerate() {
            info!("Executing step {}/{} ({} via {})", index + 1, step_count, step.step_type, step.tool);
            let mut step_execution = self.execute_step(step, signer, options).await?;
            if step_execution.has_failed() {
                execution.steps.push(step_execution);
                break;
            }

            // Later steps spend funds that only exist once the bridge delivers.
            let has_next = index + 1 < step_count;
            let hash = step_execution.tx_hash().map(str::to_string);
            if step.is_cross_chain() && has_next {
                if let Some(hash) = hash {
                    let status = self.wait_for_completion(step, &hash).await;
                    let delivered = matches!(&status, Ok(s) if s.is_done());
                    if !delivered {
                        let message = match status {
                            Ok(s) => format!(
                                "transfer ended as {}: {}",
                                s.status,
                                s.substatus_message.unwrap_or_default()
                            ),
                            Err(e) => format!("{:#}", e),
                        };
                        step_execution
                            .process
                            .push(Process::failed(ProcessKind::ReceivingChain, message));
                        execution.steps.push(step_execution);
                        break;
                    }
                    step_execution
                        .process
                        .push(Process::done(ProcessKind::ReceivingChain, None));
                }
            }
            execution.steps.push(step_execution);
        }
        Ok(execution)
    }
}
