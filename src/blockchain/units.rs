//! Exact conversion between decimal strings and smallest-unit integers.

use ethers::types::U256;

use crate::blockchain::models::{WalletError, WalletResult};

/// Parses a decimal string such as `"1.5"` into `amount * 10^decimals`.
///
/// Only integer arithmetic is used. More fractional digits than `decimals`
/// is an error rather than a silent truncation.
pub fn parse_amount(amount: &str, decimals: u8) -> WalletResult<U256> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (amount, ""),
    };

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if amount.is_empty()
        || (int_part.is_empty() && frac_part.is_empty())
        || !digits_only(int_part)
        || !digits_only(frac_part)
    {
        return Err(WalletError::InvalidParameter(format!(
            "'{}' is not a decimal amount",
            amount
        )));
    }

    let frac_digits = frac_part.trim_end_matches('0');
    if frac_digits.len() > decimals as usize {
        return Err(WalletError::InvalidParameter(format!(
            "'{}' has more than {} fractional digits",
            amount, decimals
        )));
    }

    let overflow = || WalletError::InvalidParameter(format!("amount '{}' is too large", amount));

    let scale = U256::exp10(decimals as usize);
    let whole = if int_part.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(int_part).map_err(|_| overflow())?
    };
    let fraction = if frac_digits.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{:0<width$}", frac_digits, width = decimals as usize);
        U256::from_dec_str(&padded).map_err(|_| overflow())?
    };

    whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Like [`parse_amount`] but rejects zero.
pub fn parse_positive_amount(amount: &str, decimals: u8) -> WalletResult<U256> {
    let value = parse_amount(amount, decimals)?;
    if value.is_zero() {
        return Err(WalletError::InvalidParameter(
            "amount must be greater than zero".into(),
        ));
    }
    Ok(value)
}

/// Renders a smallest-unit value as a decimal string without trailing zeros.
pub fn format_amount(value: U256, decimals: u8) -> String {
    let scale = U256::exp10(decimals as usize);
    let whole = value / scale;
    let fraction = value % scale;
    if fraction.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ether_is_exact() {
        assert_eq!(
            parse_amount("1.0", 18).unwrap(),
            U256::from_dec_str("1000000000000000000").unwrap()
        );
        assert_eq!(parse_amount("0.000000000000000001", 18).unwrap(), U256::one());
        assert_eq!(parse_amount(".5", 6).unwrap(), U256::from(500_000u64));
        assert_eq!(parse_amount("42", 0).unwrap(), U256::from(42u64));
    }

    #[test]
    fn values_that_floats_would_mangle() {
        // 0.1 + 0.2 style amounts must not drift.
        assert_eq!(
            parse_amount("0.3", 18).unwrap(),
            U256::from_dec_str("300000000000000000").unwrap()
        );
        assert_eq!(
            parse_amount("123456789.123456789123456789", 18).unwrap(),
            U256::from_dec_str("123456789123456789123456789").unwrap()
        );
    }

    #[test]
    fn rejects_excess_precision_and_garbage() {
        assert!(parse_amount("1.0000001", 6).is_err());
        assert!(parse_amount("1.1000000", 6).is_ok());
        assert!(parse_amount("abc", 18).is_err());
        assert!(parse_amount("-1", 18).is_err());
        assert!(parse_amount("1,5", 18).is_err());
        assert!(parse_amount(".", 18).is_err());
        assert!(parse_positive_amount("0.0", 18).is_err());
    }

    #[test]
    fn overflow_is_an_error() {
        let huge = "1".repeat(80);
        assert!(parse_amount(&huge, 18).is_err());
    }

    #[test]
    fn decimal_strings_round_trip() {
        for (input, decimals) in [("1.5", 18u8), ("0.000001", 6), ("1000", 18), ("7.25", 2)] {
            let units = parse_amount(input, decimals).unwrap();
            assert_eq!(format_amount(units, decimals), input);
            assert_eq!(parse_amount(&format_amount(units, decimals), decimals).unwrap(), units);
        }
        assert_eq!(format_amount(parse_amount("1.0", 18).unwrap(), 18), "1");
    }
}
