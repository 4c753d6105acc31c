use crate::{
    api::{wallet_error, ApiError},
    blockchain::models::{BridgeParams, SwapParams, TransactionResult},
    AppState,
};
use axum::{extract::State, Json};
use tracing::{error, info};

pub async fn swap_handler(
    State(state): State<AppState>,
    Json(request): Json<SwapParams>,
) -> Result<Json<TransactionResult>, ApiError> {
    info!(
        "Received swap of {} {} -> {} on {}",
        request.amount, request.from_token, request.to_token, request.chain
    );
    state.wallet.swap(&request).await.map(Json).map_err(|e| {
        error!("Swap failed: {}", e);
        wallet_error(&e)
    })
}

pub async fn bridge_handler(
    State(state): State<AppState>,
    Json(request): Json<BridgeParams>,
) -> Result<Json<TransactionResult>, ApiError> {
    info!(
        "Received bridge of {} {} from {} to {}",
        request.amount, request.from_token, request.from_chain, request.to_chain
    );
    state.wallet.bridge(&request).await.map(Json).map_err(|e| {
        error!("Bridge failed: {}", e);
        wallet_error(&e)
    })
}
