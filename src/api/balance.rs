use crate::{
    api::{wallet_error, ApiError},
    blockchain::models::BalanceResponse,
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::warn;

// Defines the structure for the JSON output returned by our API.
// `balance` is null when the node gave no data.
#[derive(Debug, Serialize)]
pub struct BalanceOutput {
    pub address: String,
    pub balance: Option<BalanceResponse>,
}

// The handler function for the GET /balance endpoint.
pub async fn current_balance_handler(State(state): State<AppState>) -> Json<BalanceOutput> {
    let balance = state.wallet.balance().await;
    if balance.is_none() {
        warn!("No balance data for the current chain");
    }
    Json(BalanceOutput {
        address: state.wallet.address(),
        balance,
    })
}

// The handler function for the GET /balance/{chain} endpoint. Switches the session.
pub async fn chain_balance_handler(
    Path(chain): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BalanceOutput>, ApiError> {
    let balance = state
        .wallet
        .balance_on(&chain)
        .await
        .map_err(|e| wallet_error(&e))?;
    Ok(Json(BalanceOutput {
        address: state.wallet.address(),
        balance,
    }))
}
