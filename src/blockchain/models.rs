// src/blockchain/models.rs
use std::borrow::Cow;

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

pub type WalletResult<T> = std::result::Result<T, WalletError>;

/// Default swap/bridge slippage tolerance in basis points (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

// --- Error types for wallet operations ---

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("unknown chain: {0}")]
    UnknownChain(String),
    #[error("no signing client connected for chain: {0}")]
    NotConnected(String),
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("insufficient balance on {chain}: required {required}, available {available}")]
    InsufficientBalance {
        chain: String,
        required: U256,
        available: U256,
    },
    #[error("no route found: {0}")]
    NoRouteFound(String),
    #[error("route execution failed ({status}): {detail}")]
    ExecutionFailed { status: String, detail: String },
    #[error("transfer failed: {0}")]
    TransferFailed(String),
    #[error("rpc error on {chain}: {detail}")]
    Rpc { chain: String, detail: String },
    #[error("aggregator error: {0}")]
    Aggregator(String),
}

impl WalletError {
    /// Short machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::InvalidParameter(_) => "invalid_parameter",
            WalletError::UnknownChain(_) => "unknown_chain",
            WalletError::NotConnected(_) => "not_connected",
            WalletError::InvalidCredential(_) => "invalid_credential",
            WalletError::InsufficientBalance { .. } => "insufficient_balance",
            WalletError::NoRouteFound(_) => "no_route_found",
            WalletError::ExecutionFailed { .. } => "execution_failed",
            WalletError::TransferFailed(_) => "transfer_failed",
            WalletError::Rpc { .. } => "rpc_error",
            WalletError::Aggregator(_) => "aggregator_error",
        }
    }

    /// True for failures caused by the caller's input or configuration.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            WalletError::InvalidParameter(_)
                | WalletError::UnknownChain(_)
                | WalletError::InsufficientBalance { .. }
        )
    }
}

impl From<ValidationErrors> for WalletError {
    fn from(errors: ValidationErrors) -> Self {
        WalletError::InvalidParameter(errors.to_string())
    }
}

// --- Field validators ---

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

/// Accepts `0x` followed by exactly 40 hex digits.
pub fn validate_evm_address(value: &str) -> Result<(), ValidationError> {
    let well_formed = value
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if well_formed {
        Ok(())
    } else {
        Err(invalid(
            "evm_address",
            format!("'{}' is not a 0x-prefixed 20-byte address", value),
        ))
    }
}

/// Accepts a plain non-negative decimal number that is not zero.
pub fn validate_positive_amount(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let mut parts = value.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    if value.is_empty()
        || (int_part.is_empty() && frac_part.is_empty())
        || !digits_only(int_part)
        || !digits_only(frac_part)
    {
        return Err(invalid(
            "amount",
            format!("'{}' is not a decimal amount", value),
        ));
    }
    if int_part.chars().chain(frac_part.chars()).all(|c| c == '0') {
        return Err(invalid("amount", "amount must be greater than zero".into()));
    }
    Ok(())
}

// --- Operation parameters ---

/// Native-currency transfer request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferParams {
    #[validate(length(min = 1))]
    pub from_chain: String,
    #[validate(custom = "validate_evm_address")]
    pub to_address: String,
    /// Decimal amount in the chain's native units, e.g. "1.5".
    #[validate(custom = "validate_positive_amount")]
    pub amount: String,
    /// Optional calldata as 0x-prefixed hex.
    #[serde(default)]
    pub data: Option<String>,
}

/// ERC20 transfer request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TokenTransferParams {
    #[validate(length(min = 1))]
    pub chain: String,
    #[validate(custom = "validate_evm_address")]
    pub token: String,
    #[validate(custom = "validate_evm_address")]
    pub to_address: String,
    #[validate(custom = "validate_positive_amount")]
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwapParams {
    #[validate(length(min = 1))]
    pub chain: String,
    #[validate(custom = "validate_evm_address")]
    pub from_token: String,
    #[validate(custom = "validate_evm_address")]
    pub to_token: String,
    #[validate(custom = "validate_positive_amount")]
    pub amount: String,
    #[serde(default)]
    #[validate(range(min = 1, max = 500))]
    pub slippage_bps: Option<u32>,
}

impl SwapParams {
    pub fn slippage_bps(&self) -> u32 {
        self.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BridgeParams {
    #[validate(length(min = 1))]
    pub from_chain: String,
    #[validate(length(min = 1))]
    pub to_chain: String,
    #[validate(custom = "validate_evm_address")]
    pub from_token: String,
    #[validate(custom = "validate_evm_address")]
    pub to_token: String,
    #[validate(custom = "validate_positive_amount")]
    pub amount: String,
    /// Destination account; defaults to the sender.
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 500))]
    pub slippage_bps: Option<u32>,
}

impl BridgeParams {
    pub fn slippage_bps(&self) -> u32 {
        self.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS)
    }
}

// --- Results ---

/// Normalized outcome of a transfer, swap or bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Amount in the smallest unit of the transferred asset.
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub chain_id: u64,
}

/// Native balance on one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub chain: String,
    pub chain_id: u64,
    /// Smallest-unit amount.
    pub amount: String,
    /// Human readable amount in native units.
    pub formatted: String,
    pub denom: String,
}
