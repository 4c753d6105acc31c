//! # API Module
//!
//! HTTP handlers for the agent wallet. All routes are nested under `/api`.
//!
//! ## Available Endpoints
//!
//! ### Session
//! - `GET /health` - Liveness check
//! - `GET /wallet` - Agent address and current chain
//! - `GET /chains` - Configured chains
//!
//! ### Balances
//! - `GET /balance` - Native balance on the current chain
//! - `GET /balance/:chain` - Native balance on a given chain
//!
//! ### Transactions
//! - `POST /transfer` - Native transfer
//! - `POST /transfer/token` - ERC-20 transfer
//! - `POST /swap` - Same-chain swap through the route aggregator
//! - `POST /bridge` - Cross-chain transfer through the route aggregator
//!
//! ### MCP
//! - `POST /rpc` - JSON-RPC tool calls over HTTP

pub mod balance;
pub mod chains;
pub mod health;
pub mod route;
pub mod rpc;
pub mod transfer;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{blockchain::models::WalletError, AppState};

pub type ApiError = (StatusCode, Json<Value>);

/// Maps a wallet failure to an HTTP status with a machine-readable `kind`.
pub fn wallet_error(err: &WalletError) -> ApiError {
    let status = match err {
        e if e.is_caller_error() => StatusCode::BAD_REQUEST,
        WalletError::NoRouteFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WalletError::NotConnected(_)
        | WalletError::Rpc { .. }
        | WalletError::Aggregator(_)
        | WalletError::TransferFailed(_)
        | WalletError::ExecutionFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({ "error": err.to_string(), "kind": err.kind() })),
    )
}

/// Builds the `/api` router.
pub fn router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health::health_handler))
        .route("/wallet", get(chains::wallet_handler))
        .route("/chains", get(chains::list_chains_handler))
        .route("/balance", get(balance::current_balance_handler))
        .route("/balance/:chain", get(balance::chain_balance_handler))
        .route("/transfer", post(transfer::transfer_handler))
        .route("/transfer/token", post(transfer::transfer_token_handler))
        .route("/swap", post(route::swap_handler))
        .route("/bridge", post(route::bridge_handler))
        // JSON-RPC endpoint for MCP tool calls
        .route("/rpc", post(rpc::rpc_handler));

    Router::new().nest("/api", api_router).with_state(state)
}
