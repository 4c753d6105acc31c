//! Route, step and execution records exchanged with the aggregation service.
//!
//! Field names follow the LI.FI REST API (camelCase). Amounts stay strings
//! in smallest units; they are parsed only where arithmetic is needed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inputs for a route request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutesRequest {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token_address: String,
    pub to_token_address: String,
    /// Smallest-unit amount.
    pub from_amount: String,
    pub from_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    /// Slippage tolerance in basis points.
    #[serde(skip)]
    pub slippage_bps: u32,
}

impl RoutesRequest {
    pub fn is_cross_chain(&self) -> bool {
        self.from_chain_id != self.to_chain_id
    }

    /// Slippage as the fraction the aggregator expects (50 bps = 0.005).
    pub fn slippage_fraction(&self) -> f64 {
        f64::from(self.slippage_bps) / 10_000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteToken {
    pub address: String,
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAction {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token: RouteToken,
    pub to_token: RouteToken,
    pub from_amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasCost {
    #[serde(default)]
    pub amount: String,
    #[serde(default, rename = "amountUSD", skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEstimate {
    /// Contract the source token must be approved for.
    pub approval_address: String,
    #[serde(default)]
    pub from_amount: String,
    #[serde(default)]
    pub to_amount: String,
    #[serde(default)]
    pub to_amount_min: String,
    /// Expected duration in seconds.
    #[serde(default)]
    pub execution_duration: f64,
    #[serde(default)]
    pub gas_costs: Vec<GasCost>,
}

/// Ready-to-sign transaction returned for a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTransaction {
    pub to: String,
    #[serde(default)]
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub id: String,
    /// `swap`, `cross` or `lifi` (a composite step).
    #[serde(rename = "type")]
    pub step_type: String,
    pub tool: String,
    pub action: StepAction,
    pub estimate: StepEstimate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_request: Option<StepTransaction>,
}

impl RouteStep {
    pub fn is_cross_chain(&self) -> bool {
        self.action.from_chain_id != self.action.to_chain_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_amount: String,
    pub to_amount: String,
    #[serde(default)]
    pub to_amount_min: String,
    #[serde(default, rename = "gasCostUSD", skip_serializing_if = "Option::is_none")]
    pub gas_cost_usd: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub steps: Vec<RouteStep>,
}

impl Route {
    /// Sum of the step duration estimates in seconds.
    pub fn estimated_duration(&self) -> f64 {
        self.steps.iter().map(|s| s.estimate.execution_duration).sum()
    }

    pub fn approval_address(&self) -> Option<&str> {
        self.steps.first().map(|s| s.estimate.approval_address.as_str())
    }

    pub fn gas_cost_usd(&self) -> Option<f64> {
        self.gas_cost_usd.as_deref().and_then(|c| c.parse().ok())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tools: Vec<&str> = self.steps.iter().map(|s| s.tool.as_str()).collect();
        write!(
            f,
            "Route({} {}->{} via [{}])",
            self.id,
            self.from_chain_id,
            self.to_chain_id,
            tools.join(",")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessKind {
    TokenAllowance,
    Swap,
    CrossChain,
    ReceivingChain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    Started,
    Pending,
    Done,
    Failed,
    Cancelled,
}

impl ProcessStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, ProcessStatus::Failed | ProcessStatus::Cancelled)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Started => "STARTED",
            ProcessStatus::Pending => "PENDING",
            ProcessStatus::Done => "DONE",
            ProcessStatus::Failed => "FAILED",
            ProcessStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// One on-chain action taken while executing a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    #[serde(rename = "type")]
    pub kind: ProcessKind,
    pub status: ProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Process {
    pub fn done(kind: ProcessKind, tx_hash: Option<String>) -> Self {
        Self {
            kind,
            status: ProcessStatus::Done,
            tx_hash,
            message: None,
        }
    }

    pub fn failed(kind: ProcessKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: ProcessStatus::Failed,
            tx_hash: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecution {
    pub step_id: String,
    pub chain_id: u64,
    pub process: Vec<Process>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_request: Option<StepTransaction>,
}

impl StepExecution {
    /// The step's main process: the swap or cross-chain transaction itself.
    /// Approvals and delivery tracking are recorded around it.
    pub fn result(&self) -> Option<&Process> {
        self.process
            .iter()
            .rev()
            .find(|p| matches!(p.kind, ProcessKind::Swap | ProcessKind::CrossChain))
    }

    /// Hash of the step transaction once it has been broadcast.
    pub fn tx_hash(&self) -> Option<&str> {
        self.result().and_then(|p| p.tx_hash.as_deref())
    }

    /// First process that failed or was cancelled, whatever its kind.
    pub fn failure(&self) -> Option<&Process> {
        self.process.iter().find(|p| p.status.is_failure())
    }

    pub fn has_failed(&self) -> bool {
        self.failure().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteExecution {
    pub route_id: String,
    pub steps: Vec<StepExecution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_deserializes_from_aggregator_json() {
        let json = r#"{
            "id": "route-1",
            "fromChainId": 8453,
            "toChainId": 1,
            "fromAmount": "1000000",
            "toAmount": "990000",
            "toAmountMin": "985000",
            "gasCostUSD": "0.42",
            "tags": ["RECOMMENDED"],
            "steps": [{
                "id": "step-1",
                "type": "cross",
                "tool": "stargate",
                "action": {
                    "fromChainId": 8453,
                    "toChainId": 1,
                    "fromToken": {"address": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", "chainId": 8453, "symbol": "USDC", "decimals": 6},
                    "toToken": {"address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "chainId": 1, "symbol": "USDC", "decimals": 6},
                    "fromAmount": "1000000",
                    "slippage": 0.005
                },
                "estimate": {
                    "approvalAddress": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE",
                    "toAmount": "990000",
                    "executionDuration": 120.5
                }
            }]
        }"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert!(route.steps[0].is_cross_chain());
        assert_eq!(route.approval_address(), Some("0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE"));
        assert_eq!(route.gas_cost_usd(), Some(0.42));
        assert!((route.estimated_duration() - 120.5).abs() < f64::EPSILON);
        assert_eq!(route.to_string(), "Route(route-1 8453->1 via [stargate])");
    }

    #[test]
    fn failure_markers() {
        assert!(ProcessStatus::Failed.is_failure());
        assert!(ProcessStatus::Cancelled.is_failure());
        assert!(!ProcessStatus::Done.is_failure());
        let step = StepExecution {
            step_id: "s".into(),
            chain_id: 1,
            process: vec![
                Process::done(ProcessKind::TokenAllowance, Some("0x1".into())),
                Process::failed(ProcessKind::Swap, "reverted"),
            ],
            transaction_request: None,
        };
        assert!(step.has_failed());
        assert_eq!(step.result().unwrap().status, ProcessStatus::Failed);
    }

    #[test]
    fn delivery_tracking_does_not_hide_the_step_transaction() {
        let step = StepExecution {
            step_id: "bridge".into(),
            chain_id: 8453,
            process: vec![
                Process::done(ProcessKind::CrossChain, Some("0xabc".into())),
                Process::done(ProcessKind::ReceivingChain, None),
            ],
            transaction_request: None,
        };
        assert_eq!(step.result().unwrap().kind, ProcessKind::CrossChain);
        assert_eq!(step.tx_hash(), Some("0xabc"));
        assert!(step.failure().is_none());

        let approval_failed = StepExecution {
            process: vec![Process::failed(ProcessKind::TokenAllowance, "rejected")],
            ..step
        };
        assert!(approval_failed.result().is_none());
        assert_eq!(approval_failed.failure().unwrap().kind, ProcessKind::TokenAllowance);
    }
}
