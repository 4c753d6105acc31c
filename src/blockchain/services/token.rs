// src/blockchain/services/token.rs

use anyhow::{anyhow, Result};
use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use ethers_core::utils::keccak256;

use crate::blockchain::client::ChainRpc;

/// Placeholder addresses aggregators use for the native currency.
const NATIVE_TOKEN_ADDRESSES: [&str; 2] = [
    "0x0000000000000000000000000000000000000000",
    "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
];

pub fn is_native_token(token: &Address) -> bool {
    let formatted = format!("{:?}", token);
    NATIVE_TOKEN_ADDRESSES.contains(&formatted.as_str())
}

fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

fn encode_call(sig: &str, tokens: Vec<Token>) -> Bytes {
    let mut out = selector(sig).to_vec();
    let mut tail = encode(&tokens);
    out.append(&mut tail);
    Bytes::from(out)
}

fn decode_u256(raw: &Bytes) -> Result<U256> {
    match decode(&[ParamType::Uint(256)], raw)?.first() {
        Some(Token::Uint(n)) => Ok(*n),
        _ => Err(anyhow!("eth_call result is not a uint256")),
    }
}

async fn eth_call(rpc: &dyn ChainRpc, token: Address, data: Bytes) -> Result<Bytes> {
    let tx = TransactionRequest::new().to(token).data(data);
    rpc.call(&tx).await
}

pub fn erc20_transfer_data(to: Address, amount: U256) -> Bytes {
    encode_call(
        "transfer(address,uint256)",
        vec![Token::Address(to), Token::Uint(amount)],
    )
}

pub fn erc20_approve_data(spender: Address, amount: U256) -> Bytes {
    encode_call(
        "approve(address,uint256)",
        vec![Token::Address(spender), Token::Uint(amount)],
    )
}

pub async fn erc20_decimals(rpc: &dyn ChainRpc, token: Address) -> Result<u8> {
    let raw = eth_call(rpc, token, encode_call("decimals()", vec![])).await?;
    let decimals = decode_u256(&raw)?;
    if decimals > U256::from(u8::MAX) {
        return Err(anyhow!("token {:?} reports {} decimals", token, decimals));
    }
    Ok(decimals.as_u32() as u8)
}

pub async fn erc20_balance_of(rpc: &dyn ChainRpc, token: Address, owner: Address) -> Result<U256> {
    let data = encode_call("balanceOf(address)", vec![Token::Address(owner)]);
    decode_u256(&eth_call(rpc, token, data).await?)
}

pub async fn erc20_allowance(
    rpc: &dyn ChainRpc,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256> {
    let data = encode_call(
        "allowance(address,address)",
        vec![Token::Address(owner), Token::Address(spender)],
    );
    decode_u256(&eth_call(rpc, token, data).await?)
}

/// Balance of `token` for `owner`, treating the native placeholders as the
/// chain's base currency.
pub async fn token_balance(rpc: &dyn ChainRpc, token: Address, owner: Address) -> Result<U256> {
    if is_native_token(&token) {
        rpc.balance(owner).await
    } else {
        erc20_balance_of(rpc, token, owner).await
    }
}
