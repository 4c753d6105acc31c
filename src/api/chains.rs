use axum::{extract::State, Json};
use serde::Serialize;

use crate::{blockchain::agent_wallet::ChainSummary, AppState};

#[derive(Debug, Serialize)]
pub struct WalletOutput {
    pub address: String,
    pub chain: String,
}

// GET /wallet
pub async fn wallet_handler(State(state): State<AppState>) -> Json<WalletOutput> {
    Json(WalletOutput {
        address: state.wallet.address(),
        chain: state.wallet.current_chain().await.to_string(),
    })
}

// GET /chains
pub async fn list_chains_handler(State(state): State<AppState>) -> Json<Vec<ChainSummary>> {
    Json(state.wallet.chains().await)
}
