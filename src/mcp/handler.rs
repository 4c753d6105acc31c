//! # MCP Handler Module
//!
//! Implements the Model Context Protocol tool surface of the agent wallet.
//! Every tool acts on the server's single account; no tool accepts or
//! returns key material.
//!
//! ## Supported Tools
//!
//! ### Session
//! - `get_address` - The agent's checksummed address
//! - `list_chains` - Configured chains and the current one
//! - `switch_chain` - Point the session at another chain
//!
//! ### Balances
//! - `get_balance` - Native balance on the current (or a given) chain
//! - `get_balances` - Native balance on every configured chain
//!
//! ### Transactions
//! - `transfer` - Send the chain's native currency
//! - `transfer_token` - Send an ERC-20 token
//! - `swap` - Same-chain token swap through the route aggregator
//! - `bridge` - Cross-chain transfer through the route aggregator

use crate::{
    blockchain::{
        models::{
            BridgeParams, SwapParams, TokenTransferParams, TransactionResult, TransferParams,
            WalletResult,
        },
        AgentWallet,
    },
    mcp::protocol::{error_codes, Request, Response},
    utils, AppState,
};
use serde_json::{json, Value};
use tracing::{info, warn};

// Helper: produce a result Value that always contains a text content array
// and preserves structured data for JSON-friendly clients.
fn make_texty_result(text: String, payload: Value) -> Value {
    let content = json!([{ "type": "text", "text": text }]);
    match payload {
        Value::Object(mut map) => {
            if !map.contains_key("content") {
                map.insert("content".into(), content);
            }
            Value::Object(map)
        }
        other => json!({
            "data": other,
            "content": content
        }),
    }
}

fn transaction_response(
    req_id: &Value,
    wallet: &AgentWallet,
    action: &str,
    outcome: WalletResult<TransactionResult>,
) -> Response {
    match outcome {
        Ok(result) => {
            let explorer = wallet.explorer_tx_url(result.chain_id, &result.hash);
            let mut summary = format!(
                "{} sent on chain {}: {}",
                action, result.chain_id, result.hash
            );
            let mut payload = json!(result);
            if let Some(url) = explorer {
                summary.push_str(&format!("\nExplorer: {}", url));
                payload["explorerUrl"] = json!(url);
            }
            Response::success(req_id.clone(), make_texty_result(summary, payload))
        }
        Err(e) => {
            warn!("{} failed: {}", action, e);
            Response::wallet_error(req_id.clone(), &e)
        }
    }
}

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "tools/list" => handle_tools_list(&req),
        "tools/call" => handle_tool_call(req, state).await,
        // Direct method calls are rewritten into tools/call
        "get_address" | "list_chains" | "switch_chain" | "get_balance" | "get_balances"
        | "transfer" | "transfer_token" | "swap" | "bridge" => {
            let name = req.method.clone();
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": name,
                    "arguments": req.params.clone().unwrap_or_else(|| json!({}))
                })),
            };
            handle_tool_call(wrapped, state).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

/// Handles a 'tools/call' request by dispatching it to the correct tool logic.
async fn handle_tool_call(req: Request, state: AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    let empty_args = json!({});
    let args = params.get("arguments").unwrap_or(&empty_args);
    let req_id = &req.id;
    let wallet = &state.wallet;

    match tool_name {
        "get_address" => {
            let address = wallet.address();
            let chain = wallet.current_chain().await;
            Response::success(
                req_id.clone(),
                make_texty_result(
                    format!("Agent address {} (current chain {})", address, chain),
                    json!({ "address": address, "chain": chain }),
                ),
            )
        }
        "list_chains" => {
            let chains = wallet.chains().await;
            let names: Vec<String> = chains
                .iter()
                .map(|c| {
                    let marker = if c.current { " (current)" } else { "" };
                    format!("{} [{}]{}", c.key, c.chain_id, marker)
                })
                .collect();
            Response::success(
                req_id.clone(),
                make_texty_result(names.join(", "), json!({ "chains": chains })),
            )
        }
        "switch_chain" => {
            let res: Result<Response, Response> = (async {
                let chain = utils::get_required_arg::<String>(args, "chain", req_id)?;
                let key = wallet
                    .switch_chain(&chain)
                    .await
                    .map_err(|e| Response::wallet_error(req_id.clone(), &e))?;
                Ok(Response::success(
                    req_id.clone(),
                    make_texty_result(
                        format!("Switched to {}", key),
                        json!({ "chain": key }),
                    ),
                ))
            })
            .await;
            res.unwrap_or_else(|err_resp| err_resp)
        }
        "get_balance" => {
            let res: Result<Response, Response> = (async {
                let balance = match utils::get_optional_str(args, "chain") {
                    Some(chain) => wallet
                        .balance_on(chain)
                        .await
                        .map_err(|e| Response::wallet_error(req_id.clone(), &e))?,
                    None => wallet.balance().await,
                };
                let text = match &balance {
                    Some(b) => format!("{} {} on {}", b.formatted, b.denom, b.chain),
                    None => "Balance unavailable: the node returned no data".to_string(),
                };
                Ok(Response::success(
                    req_id.clone(),
                    make_texty_result(text, json!({ "balance": balance })),
                ))
            })
            .await;
            res.unwrap_or_else(|err_resp| err_resp)
        }
        "get_balances" => {
            let balances = wallet.balances().await;
            let lines: Vec<String> = balances
                .iter()
                .map(|(chain, b)| match b {
                    Some(b) => format!("{}: {} {}", chain, b.formatted, b.denom),
                    None => format!("{}: unavailable", chain),
                })
                .collect();
            let payload: serde_json::Map<String, Value> = balances
                .into_iter()
                .map(|(chain, b)| (chain, json!(b)))
                .collect();
            Response::success(
                req_id.clone(),
                make_texty_result(lines.join("\n"), json!({ "balances": payload })),
            )
        }
        "transfer" => match utils::parse_args::<TransferParams>(args, req_id) {
            Ok(p) => transaction_response(req_id, wallet, "Transfer", wallet.transfer(&p).await),
            Err(err_resp) => err_resp,
        },
        "transfer_token" => match utils::parse_args::<TokenTransferParams>(args, req_id) {
            Ok(p) => {
                transaction_response(req_id, wallet, "Token transfer", wallet.transfer_token(&p).await)
            }
            Err(err_resp) => err_resp,
        },
        "swap" => match utils::parse_args::<SwapParams>(args, req_id) {
            Ok(p) => transaction_response(req_id, wallet, "Swap", wallet.swap(&p).await),
            Err(err_resp) => err_resp,
        },
        "bridge" => match utils::parse_args::<BridgeParams>(args, req_id) {
            Ok(p) => transaction_response(req_id, wallet, "Bridge", wallet.bridge(&p).await),
            Err(err_resp) => err_resp,
        },
        _ => Response::error(
            req_id.clone(),
            error_codes::METHOD_NOT_FOUND,
            format!("Tool not found: {}", tool_name),
        ),
    }
}

/// Handles the 'initialize' request.
fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "evm_agent_wallet",
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions =
        "Multi-chain EVM wallet for an autonomous agent: balances, transfers, swaps and bridges from one account.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": "2025-06-18",
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

/// Handles the 'tools/list' request by returning a JSON definition of all available tools.
fn handle_tools_list(req: &Request) -> Response {
    let tools = json!([
        {
            "name": "get_address",
            "description": "Get the agent wallet's address and current chain.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "list_chains",
            "description": "List the configured chains.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "switch_chain",
            "description": "Switch the current chain.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "chain": {"type": "string", "description": "Chain key, alias or numeric chain id (e.g. 'base', 'mainnet', '8453')"}
                },
                "required": ["chain"]
            }
        },
        {
            "name": "get_balance",
            "description": "Get the native balance on the current chain, or on 'chain' after switching to it.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "chain": {"type": "string", "description": "Optional chain to switch to first"}
                }
            }
        },
        {
            "name": "get_balances",
            "description": "Get the native balance on every configured chain.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "transfer",
            "description": "Send the native currency of a chain.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "from_chain": {"type": "string"},
                    "to_address": {"type": "string", "description": "0x recipient address"},
                    "amount": {"type": "string", "description": "Decimal amount in native units, e.g. '0.5'"},
                    "data": {"type": "string", "description": "Optional 0x calldata"}
                },
                "required": ["from_chain", "to_address", "amount"]
            }
        },
        {
            "name": "transfer_token",
            "description": "Send an ERC-20 token.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "chain": {"type": "string"},
                    "token": {"type": "string", "description": "0x token contract address"},
                    "to_address": {"type": "string"},
                    "amount": {"type": "string", "description": "Decimal amount in token units"}
                },
                "required": ["chain", "token", "to_address", "amount"]
            }
        },
        {
            "name": "swap",
            "description": "Swap tokens on one chain through the route aggregator.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "chain": {"type": "string"},
                    "from_token": {"type": "string", "description": "0x token address; 0x000...0 for the native currency"},
                    "to_token": {"type": "string"},
                    "amount": {"type": "string"},
                    "slippage_bps": {"type": "integer", "minimum": 1, "maximum": 500}
                },
                "required": ["chain", "from_token", "to_token", "amount"]
            }
        },
        {
            "name": "bridge",
            "description": "Move tokens to another chain through the route aggregator.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "from_chain": {"type": "string"},
                    "to_chain": {"type": "string"},
                    "from_token": {"type": "string"},
                    "to_token": {"type": "string"},
                    "amount": {"type": "string"},
                    "to_address": {"type": "string", "description": "Optional recipient; defaults to the agent"},
                    "slippage_bps": {"type": "integer", "minimum": 1, "maximum": 500}
                },
                "required": ["from_chain", "to_chain", "from_token", "to_token", "amount"]
            }
        }
    ]);
    Response::success(req.id.clone(), json!({ "tools": tools }))
}
