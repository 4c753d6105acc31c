//! Shared fixtures: in-memory chain nodes and a scripted route aggregator.
#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use ethers::utils::keccak256;
use secrecy::SecretString;

use evm_agent_wallet::{
    aggregator::{
        types::{
            Process, ProcessKind, Route, RouteExecution, RouteStep, RouteToken, RoutesRequest,
            StepAction, StepEstimate, StepExecution, StepTransaction,
        },
        ExecutionOptions, ExecutionSigner, RouteAggregator,
    },
    blockchain::{
        client::{ChainRpc, RpcConnector},
        registry::{ChainDescriptor, ChainKey, ChainRegistry},
        session::WalletSession,
    },
};

/// Hardhat's first development account.
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
pub const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
pub const NATIVE: &str = "0x0000000000000000000000000000000000000000";
pub const APPROVAL_ADDRESS: &str = "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE";

pub fn abc_hash() -> H256 {
    H256::from_str("0xabc0000000000000000000000000000000000000000000000000000000000000").unwrap()
}

pub fn ether(n: u64) -> U256 {
    U256::exp10(18) * U256::from(n)
}

fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

/// Scripted node. Every request is counted; signed envelopes are recorded.
pub struct StubRpc {
    pub chain_id: u64,
    /// Native balance; `None` makes the balance query fail.
    pub balance: Option<U256>,
    pub token_balance: U256,
    pub token_decimals: u8,
    pub allowance: U256,
    pub gas: U256,
    pub gas_price: U256,
    pub pending_nonce: U256,
    pub tx_hash: H256,
    pub fail_broadcast: AtomicBool,
    pub requests: AtomicUsize,
    pub raw_txs: Mutex<Vec<Bytes>>,
}

impl StubRpc {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            balance: Some(ether(10)),
            token_balance: U256::from(1_000_000_000u64),
            token_decimals: 6,
            allowance: U256::zero(),
            gas: U256::from(21_000u64),
            gas_price: U256::from(1_000_000_000u64),
            pending_nonce: U256::zero(),
            tx_hash: abc_hash(),
            fail_broadcast: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            raw_txs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_balance(mut self, balance: Option<U256>) -> Self {
        self.balance = balance;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn broadcasts(&self) -> Vec<Bytes> {
        self.raw_txs.lock().unwrap().clone()
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainRpc for StubRpc {
    fn endpoint(&self) -> String {
        format!("stub://{}", self.chain_id)
    }

    async fn chain_id(&self) -> Result<u64> {
        self.hit();
        Ok(self.chain_id)
    }

    async fn balance(&self, _address: Address) -> Result<U256> {
        self.hit();
        self.balance.ok_or_else(|| anyhow!("node unavailable"))
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<U256> {
        self.hit();
        Ok(self.gas)
    }

    async fn gas_price(&self) -> Result<U256> {
        self.hit();
        Ok(self.gas_price)
    }

    async fn transaction_count(&self, _address: Address) -> Result<U256> {
        self.hit();
        Ok(self.pending_nonce)
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        self.hit();
        let data = tx.data.clone().unwrap_or_default();
        let value = match data.get(0..4) {
            Some(s) if s == selector("decimals()") => U256::from(self.token_decimals),
            Some(s) if s == selector("balanceOf(address)") => self.token_balance,
            Some(s) if s == selector("allowance(address,address)") => self.allowance,
            _ => return Err(anyhow!("execution reverted")),
        };
        Ok(Bytes::from(encode(&[Token::Uint(value)])))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        self.hit();
        if self.fail_broadcast.load(Ordering::SeqCst) {
            return Err(anyhow!("nonce too low"));
        }
        self.raw_txs.lock().unwrap().push(raw);
        Ok(self.tx_hash)
    }
}

/// Hands out stub nodes by chain id; chains without a stub fail to connect.
#[derive(Default)]
pub struct StubConnector {
    pub nodes: HashMap<u64, Arc<StubRpc>>,
}

impl StubConnector {
    pub fn with(mut self, node: Arc<StubRpc>) -> Self {
        self.nodes.insert(node.chain_id, node);
        self
    }
}

impl RpcConnector for StubConnector {
    fn connect(&self, key: &ChainKey, descriptor: &ChainDescriptor) -> Result<Arc<dyn ChainRpc>> {
        self.nodes
            .get(&descriptor.chain_id)
            .cloned()
            .map(|node| node as Arc<dyn ChainRpc>)
            .ok_or_else(|| anyhow!("no node for {}", key))
    }
}

pub fn secret() -> SecretString {
    SecretString::new(TEST_KEY.to_string())
}

/// Session over the built-in chains with the given stub nodes.
pub fn session_with(nodes: &[Arc<StubRpc>]) -> WalletSession {
    let connector = nodes
        .iter()
        .fold(StubConnector::default(), |c, n| c.with(n.clone()));
    WalletSession::initialize_with(&secret(), ChainRegistry::builtin(), &connector)
        .expect("session initializes")
}

pub fn token(address: &str, chain_id: u64) -> RouteToken {
    RouteToken {
        address: address.to_string(),
        chain_id,
        symbol: String::new(),
        decimals: 0,
    }
}

pub fn step(id: &str, from_chain: u64, to_chain: u64, from_token: &str, amount: &str) -> RouteStep {
    RouteStep {
        id: id.to_string(),
        step_type: if from_chain == to_chain { "swap" } else { "cross" }.to_string(),
        tool: "stub".to_string(),
        action: StepAction {
            from_chain_id: from_chain,
            to_chain_id: to_chain,
            from_token: token(from_token, from_chain),
            to_token: token(USDC_BASE, to_chain),
            from_amount: amount.to_string(),
            from_address: None,
            to_address: None,
            slippage: None,
        },
        estimate: StepEstimate {
            approval_address: APPROVAL_ADDRESS.to_string(),
            from_amount: amount.to_string(),
            to_amount: "990000".to_string(),
            to_amount_min: "985000".to_string(),
            execution_duration: 30.0,
            gas_costs: vec![],
        },
        transaction_request: None,
    }
}

pub fn route(id: &str, steps: Vec<RouteStep>) -> Route {
    let first = steps.first().expect("route has steps");
    let last = steps.last().expect("route has steps");
    Route {
        id: id.to_string(),
        from_chain_id: first.action.from_chain_id,
        to_chain_id: last.action.to_chain_id,
        from_amount: first.action.from_amount.clone(),
        to_amount: last.estimate.to_amount.clone(),
        to_amount_min: last.estimate.to_amount_min.clone(),
        gas_cost_usd: None,
        tags: vec![],
        steps,
    }
}

/// How the scripted aggregator finishes each step.
#[derive(Debug, Clone)]
pub enum StubOutcome {
    Done(String),
    Failed(String),
}

/// Aggregator double that records what it was asked and signs nothing.
pub struct StubAggregator {
    pub routes: Vec<Route>,
    pub outcome: StubOutcome,
    pub route_requests: Mutex<Vec<RoutesRequest>>,
    pub executed: Mutex<Vec<String>>,
    /// Chain id of the signer each step ran with.
    pub signer_chains: Mutex<Vec<u64>>,
}

impl StubAggregator {
    pub fn new(routes: Vec<Route>, outcome: StubOutcome) -> Self {
        Self {
            routes,
            outcome,
            route_requests: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            signer_chains: Mutex::new(Vec::new()),
        }
    }

    pub fn route_request_count(&self) -> usize {
        self.route_requests.lock().unwrap().len()
    }

    pub fn executed_routes(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RouteAggregator for StubAggregator {
    async fn get_routes(&self, request: &RoutesRequest) -> Result<Vec<Route>> {
        self.route_requests.lock().unwrap().push(request.clone());
        Ok(self.routes.clone())
    }

    async fn execute_route(
        &self,
        route: Route,
        signer: &dyn ExecutionSigner,
        _options: &ExecutionOptions,
    ) -> Result<RouteExecution> {
        self.executed.lock().unwrap().push(route.id.clone());
        let mut steps = Vec::new();
        for step in &route.steps {
            let mut client = signer.current_signer().await?;
            if client.chain_id() != step.action.from_chain_id {
                client = signer.switch_chain(step.action.from_chain_id).await?;
            }
            self.signer_chains.lock().unwrap().push(client.chain_id());
            let process = match &self.outcome {
                StubOutcome::Done(hash) => Process::done(ProcessKind::Swap, Some(hash.clone())),
                StubOutcome::Failed(message) => Process::failed(ProcessKind::Swap, message.clone()),
            };
            steps.push(StepExecution {
                step_id: step.id.clone(),
                chain_id: step.action.from_chain_id,
                process: vec![process],
                transaction_request: Some(StepTransaction {
                    to: APPROVAL_ADDRESS.to_string(),
                    data: "0xdeadbeef".to_string(),
                    value: None,
                    gas_limit: None,
                    gas_price: None,
                    chain_id: Some(step.action.from_chain_id),
                }),
            });
        }
        Ok(RouteExecution {
            route_id: route.id,
            steps,
        })
    }
}
