use ethers::types::U256;

use crate::blockchain::{
    models::{BalanceResponse, WalletResult},
    registry::{ChainDescriptor, ChainKey},
    session::WalletSession,
    units,
};

fn to_response(key: &ChainKey, descriptor: &ChainDescriptor, wei: U256) -> BalanceResponse {
    BalanceResponse {
        chain: key.to_string(),
        chain_id: descriptor.chain_id,
        amount: wei.to_string(),
        formatted: units::format_amount(wei, descriptor.native_currency.decimals),
        denom: descriptor.native_currency.symbol.clone(),
    }
}

/// Native balance on the session's current chain, `None` when unavailable.
pub async fn current_balance(session: &WalletSession) -> Option<BalanceResponse> {
    let guard = session.lock().await;
    let wei = guard.balance().await?;
    let descriptor = guard.descriptor().ok()?;
    Some(to_response(guard.current_chain(), descriptor, wei))
}

/// Switches to `key` and reads its native balance under one lock, so no other
/// switch can land in between.
pub async fn chain_balance(
    session: &WalletSession,
    key: &ChainKey,
) -> WalletResult<Option<BalanceResponse>> {
    let mut guard = session.lock().await;
    guard.switch_chain(key)?;
    let descriptor = guard.descriptor()?;
    Ok(guard
        .balance()
        .await
        .map(|wei| to_response(guard.current_chain(), descriptor, wei)))
}

/// Native balance per chain; chains without data are reported as `None`.
pub async fn all_balances(session: &WalletSession) -> Vec<(String, Option<BalanceResponse>)> {
    let registry = session.registry();
    session
        .balances()
        .await
        .into_iter()
        .map(|(key, wei)| {
            let response = wei.and_then(|wei| {
                registry
                    .resolve(&key)
                    .ok()
                    .map(|descriptor| to_response(&key, descriptor, wei))
            });
            (key.to_string(), response)
        })
        .collect()
}
