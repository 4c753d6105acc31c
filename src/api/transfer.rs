use crate::{
    api::{wallet_error, ApiError},
    blockchain::models::{TokenTransferParams, TransactionResult, TransferParams},
    AppState,
};
use axum::{extract::State, Json};
use tracing::{error, info};

pub async fn transfer_handler(
    State(state): State<AppState>,
    Json(request): Json<TransferParams>,
) -> Result<Json<TransactionResult>, ApiError> {
    info!(
        "Received transfer request to {} on {}, amount: {}",
        request.to_address, request.from_chain, request.amount
    );
    match state.wallet.transfer(&request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!("Transfer failed: {}", e);
            Err(wallet_error(&e))
        }
    }
}

pub async fn transfer_token_handler(
    State(state): State<AppState>,
    Json(request): Json<TokenTransferParams>,
) -> Result<Json<TransactionResult>, ApiError> {
    info!(
        "Received token transfer of {} {} to {} on {}",
        request.amount, request.token, request.to_address, request.chain
    );
    match state.wallet.transfer_token(&request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!("Token transfer failed: {}", e);
            Err(wallet_error(&e))
        }
    }
}
