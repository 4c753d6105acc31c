// src/blockchain/services/transactions.rs

use std::str::FromStr;

use anyhow::{Context, Result};
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use ethers::utils::to_checksum;
use tracing::{info, warn};
use validator::Validate;

use crate::blockchain::{
    client::SigningClient,
    models::{TokenTransferParams, TransactionResult, TransferParams, WalletError, WalletResult},
    services::token,
    session::{SessionGuard, WalletSession},
    units,
};

/// Parses an already validated `0x` address.
pub(crate) fn parse_address(field: &str, value: &str) -> WalletResult<Address> {
    Address::from_str(value)
        .map_err(|_| WalletError::InvalidParameter(format!("invalid {}: '{}'", field, value)))
}

pub(crate) fn parse_calldata(data: Option<&str>) -> WalletResult<Option<Bytes>> {
    match data.map(str::trim).filter(|d| !d.is_empty() && *d != "0x") {
        None => Ok(None),
        Some(d) => {
            let hex_data = d.strip_prefix("0x").ok_or_else(|| {
                WalletError::InvalidParameter("calldata must be 0x-prefixed hex".into())
            })?;
            hex::decode(hex_data)
                .map(|bytes| Some(Bytes::from(bytes)))
                .map_err(|_| WalletError::InvalidParameter("calldata is not valid hex".into()))
        }
    }
}

pub(crate) fn hex_data(data: &Bytes) -> String {
    format!("0x{}", hex::encode(data))
}

/// Estimates gas, picks gas price and nonce, signs locally and broadcasts.
///
/// Returns once the node accepts the envelope; inclusion is not awaited.
/// Fields already set on `tx_request` are kept.
pub async fn send_evm_transaction(
    signer: &SigningClient,
    tx_request: TransactionRequest,
) -> Result<H256> {
    let rpc = signer.rpc();
    let chain = signer.chain().clone();
    let from_address = signer.address();

    let mut tx = tx_request.from(from_address).chain_id(signer.chain_id());

    if tx.gas.is_none() {
        let gas = rpc
            .estimate_gas(&tx)
            .await
            .with_context(|| format!("estimating gas on {}", chain))?;
        tx = tx.gas(gas);
    }

    if tx.gas_price.is_none() {
        let gas_price = rpc
            .gas_price()
            .await
            .with_context(|| format!("fetching gas price on {}", chain))?;
        tx = tx.gas_price(gas_price);
    }

    let nonce = signer
        .nonces()
        .next_nonce(rpc.as_ref(), signer.chain_id(), from_address)
        .await
        .with_context(|| format!("fetching nonce on {}", chain))?;
    tx = tx.nonce(nonce);

    let raw_tx = signer
        .sign(tx)
        .await
        .with_context(|| format!("signing transaction for {}", chain))?;

    let tx_hash = rpc
        .send_raw_transaction(raw_tx)
        .await
        .with_context(|| format!("broadcasting transaction on {}", chain))?;

    signer
        .nonces()
        .mark_broadcast(signer.chain_id(), from_address, nonce)
        .await;
    info!("Broadcast {:?} on {} with nonce {}", tx_hash, chain, nonce);
    Ok(tx_hash)
}

/// Checks that `available` covers `required` on the current chain.
pub(crate) fn ensure_balance(
    guard: &SessionGuard,
    required: U256,
    available: U256,
) -> WalletResult<()> {
    if available < required {
        return Err(WalletError::InsufficientBalance {
            chain: guard.current_chain().to_string(),
            required,
            available,
        });
    }
    Ok(())
}

/// Sends the chain's native currency.
pub async fn transfer(
    session: &WalletSession,
    params: &TransferParams,
) -> WalletResult<TransactionResult> {
    params.validate()?;
    let to = parse_address("to_address", &params.to_address)?;
    let data = parse_calldata(params.data.as_deref())?;
    let chain = session.registry().resolve_key(&params.from_chain)?;

    let mut guard = session.lock().await;
    guard.switch_chain(&chain)?;
    let descriptor = guard.descriptor()?.clone();
    let value = units::parse_positive_amount(&params.amount, descriptor.native_currency.decimals)?;
    let signer = guard.signing_client()?;

    let available = signer
        .rpc()
        .balance(signer.address())
        .await
        .with_context(|| format!("querying balance on {}", chain))
        .map_err(|e| WalletError::TransferFailed(format!("{:#}", e)))?;
    ensure_balance(&guard, value, available)?;

    info!(
        "Transferring {} {} to {:?} on {}",
        params.amount, descriptor.native_currency.symbol, to, chain
    );

    let mut tx = TransactionRequest::new().to(to).value(value);
    if let Some(data) = data.clone() {
        tx = tx.data(data);
    }

    let hash = send_evm_transaction(&signer, tx).await.map_err(|e| {
        warn!("Transfer on {} failed: {:#}", chain, e);
        WalletError::TransferFailed(format!("{:#}", e))
    })?;

    Ok(TransactionResult {
        hash: format!("{:?}", hash),
        from: to_checksum(&signer.address(), None),
        to: to_checksum(&to, None),
        value: value.to_string(),
        data: data.as_ref().map(hex_data),
        chain_id: descriptor.chain_id,
    })
}

/// Sends an ERC20 token with `transfer(address,uint256)`.
pub async fn transfer_token(
    session: &WalletSession,
    params: &TokenTransferParams,
) -> WalletResult<TransactionResult> {
    params.validate()?;
    let token_address = parse_address("token", &params.token)?;
    let to = parse_address("to_address", &params.to_address)?;
    if token::is_native_token(&token_address) {
        return Err(WalletError::InvalidParameter(
            "use a native transfer for the chain's base currency".into(),
        ));
    }
    let chain = session.registry().resolve_key(&params.chain)?;

    let mut guard = session.lock().await;
    guard.switch_chain(&chain)?;
    let chain_id = guard.descriptor()?.chain_id;
    let signer = guard.signing_client()?;
    let rpc = signer.rpc().clone();

    let decimals = token::erc20_decimals(rpc.as_ref(), token_address)
        .await
        .map_err(|e| WalletError::TransferFailed(format!("reading token decimals: {:#}", e)))?;
    let amount = units::parse_positive_amount(&params.amount, decimals)?;
    let available = token::erc20_balance_of(rpc.as_ref(), token_address, signer.address())
        .await
        .map_err(|e| WalletError::TransferFailed(format!("reading token balance: {:#}", e)))?;
    ensure_balance(&guard, amount, available)?;

    info!(
        "Transferring {} of token {:?} to {:?} on {}",
        params.amount, token_address, to, chain
    );

    let data = token::erc20_transfer_data(to, amount);
    let tx = TransactionRequest::new().to(token_address).data(data.clone());
    let hash = send_evm_transaction(&signer, tx)
        .await
        .map_err(|e| WalletError::TransferFailed(format!("{:#}", e)))?;

    Ok(TransactionResult {
        hash: format!("{:?}", hash),
        from: to_checksum(&signer.address(), None),
        to: to_checksum(&token_address, None),
        value: amount.to_string(),
        data: Some(hex_data(&data)),
        chain_id,
    })
}
