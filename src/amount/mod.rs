/*
 * Conversion between human decimal amounts and 18-decimal on-chain integers
 *
 * Parsing is exact: digits past the 18th fractional place are dropped (truncation
 * toward zero), nothing goes through binary floating point. Display is a policy,
 * not a precision guarantee: order and position sizes show 4 decimals, balances
 * show 6, and the remaining digits are cut off rather than rounded.
 *
 * `to_chain_amount` and `from_chain_amount` form the public round trip between
 * human decimals and chain integers; the pipelines only need the first.
 */

use ethers::types::{I256, U256};
use num_bigint::BigUint;
use num_traits::Zero;
use rust_decimal::Decimal;

use crate::models::{GridHookError, Result};

pub const TOKEN_DECIMALS: u32 = 18;
pub const ORDER_DISPLAY_DECIMALS: usize = 4;
pub const BALANCE_DISPLAY_DECIMALS: usize = 6;

struct ScaledDecimal {
    negative: bool,
    magnitude: BigUint,
}

fn parse_scaled(input: &str) -> Result<ScaledDecimal> {
    let trimmed = input.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (int_digits, frac_digits) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int_digits.is_empty() && frac_digits.is_empty())
        || !all_digits(int_digits)
        || !all_digits(frac_digits)
    {
        return Err(GridHookError::ValidationError(format!(
            "'{input}' is not a plain decimal amount"
        )));
    }

    let decimals = TOKEN_DECIMALS as usize;
    let kept: &str = if frac_digits.len() > decimals {
        &frac_digits[..decimals]
    } else {
        frac_digits
    };
    let digits = format!("{int_digits}{kept:0<decimals$}");

    let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| {
        GridHookError::ValidationError(format!("'{input}' is not a plain decimal amount"))
    })?;

    Ok(ScaledDecimal { negative, magnitude })
}

fn to_u256(value: &BigUint, input: &str) -> Result<U256> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(GridHookError::ValidationError(format!(
            "amount {input} exceeds the uint256 range"
        )));
    }
    Ok(U256::from_big_endian(&bytes))
}

fn to_biguint(value: U256) -> BigUint {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigUint::from_bytes_be(&buf)
}

/// Order sizes: strictly positive, direction is carried separately.
pub fn to_chain_amount(input: &str) -> Result<U256> {
    let parsed = parse_scaled(input)?;
    if parsed.negative && !parsed.magnitude.is_zero() {
        return Err(GridHookError::ValidationError(format!(
            "amount must be positive, got {input}"
        )));
    }
    if parsed.magnitude.is_zero() {
        return Err(GridHookError::ValidationError(format!(
            "amount must be greater than zero (after truncating to {TOKEN_DECIMALS} decimals), got {input}"
        )));
    }
    to_u256(&parsed.magnitude, input)
}

/// Signed variant used for swap `amountSpecified`.
pub fn to_signed_chain_amount(input: &str) -> Result<I256> {
    let parsed = parse_scaled(input)?;
    if parsed.magnitude.is_zero() {
        return Err(GridHookError::ValidationError(format!(
            "amount must be non-zero, got {input}"
        )));
    }

    let magnitude = to_u256(&parsed.magnitude, input)?;
    if magnitude.bit(255) {
        return Err(GridHookError::ValidationError(format!(
            "amount {input} exceeds the int256 range"
        )));
    }

    let value = I256::from_raw(magnitude);
    Ok(if parsed.negative { -value } else { value })
}

/// Exact inverse of `to_chain_amount` for library callers that need a number
/// rather than display text. Text rendering goes through `format_amount`.
pub fn from_chain_amount(value: U256) -> Result<Decimal> {
    if value.bits() > 96 {
        return Err(GridHookError::ContractError(format!(
            "amount {value} is too large for a decimal value"
        )));
    }
    let mantissa = i128::try_from(value.as_u128())
        .map_err(|e| GridHookError::ContractError(format!("amount {value}: {e}")))?;

    Decimal::try_from_i128_with_scale(mantissa, TOKEN_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| GridHookError::ContractError(format!("amount {value}: {e}")))
}

/// Fixed-width rendering truncated to `places` fractional digits. Works for the
/// whole uint256 range, unlike `from_chain_amount`.
#[must_use]
pub fn format_amount(value: U256, places: usize) -> String {
    let unit = BigUint::from(10u32).pow(TOKEN_DECIMALS);
    let raw = to_biguint(value);
    let whole = &raw / &unit;
    let fraction = &raw % &unit;

    if places == 0 {
        return whole.to_string();
    }

    let width = TOKEN_DECIMALS as usize;
    let fraction = format!("{:0>width$}", fraction.to_string());
    let shown = &fraction[..places.min(width)];
    format!("{whole}.{shown:0<places$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn one_token_is_ten_to_the_eighteen() {
        assert_eq!(
            to_chain_amount("1").unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(
            to_chain_amount("1.5").unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(to_chain_amount(".5").unwrap(), U256::from(500_000_000_000_000_000u128));
    }

    #[test]
    fn extra_fractional_digits_truncate_toward_zero() {
        assert_eq!(
            to_chain_amount("0.0000000000000000019").unwrap(),
            U256::from(1u8)
        );
        assert_eq!(
            to_signed_chain_amount("-0.0000000000000000019").unwrap(),
            I256::from(-1i64)
        );
        assert!(to_chain_amount("0.0000000000000000001").is_err());
    }

    #[test]
    fn order_amounts_reject_sign_and_garbage() {
        assert!(to_chain_amount("-1").is_err());
        assert!(to_chain_amount("0").is_err());
        assert!(to_chain_amount("1e18").is_err());
        assert!(to_chain_amount("NaN").is_err());
        assert!(to_chain_amount("inf").is_err());
        assert!(to_chain_amount("1.2.3").is_err());
        assert!(to_chain_amount("").is_err());
        assert!(to_chain_amount(".").is_err());
    }

    #[test]
    fn swap_amounts_keep_their_sign() {
        assert_eq!(
            to_signed_chain_amount("2").unwrap(),
            I256::from(2_000_000_000_000_000_000i128)
        );
        assert_eq!(
            to_signed_chain_amount("-2").unwrap(),
            I256::from(-2_000_000_000_000_000_000i128)
        );
        assert!(to_signed_chain_amount("0.000").is_err());
    }

    #[test]
    fn huge_values_are_rejected_not_wrapped() {
        let too_big = format!("1{}", "0".repeat(80));
        assert!(to_chain_amount(&too_big).is_err());
        assert!(to_signed_chain_amount(&too_big).is_err());
    }

    #[test]
    fn chain_round_trip_is_exact_up_to_eighteen_decimals() {
        for input in ["1", "1.5", "0.000000000000000001", "123456.123456789012345678", "42"] {
            let chain = to_chain_amount(input).unwrap();
            let back = from_chain_amount(chain).unwrap();
            assert_eq!(back, Decimal::from_str(input).unwrap(), "round trip of {input}");
        }
    }

    #[test]
    fn display_truncates_instead_of_rounding() {
        let value = to_chain_amount("1.99999999").unwrap();
        assert_eq!(format_amount(value, ORDER_DISPLAY_DECIMALS), "1.9999");
        assert_eq!(format_amount(value, BALANCE_DISPLAY_DECIMALS), "1.999999");
        assert_eq!(format_amount(U256::zero(), ORDER_DISPLAY_DECIMALS), "0.0000");
        assert_eq!(format_amount(value, 0), "1");
    }

    #[test]
    fn display_handles_full_uint256_range() {
        let rendered = format_amount(U256::MAX, 2);
        assert!(rendered.starts_with("115792089237316195423570985008687907853269984665640564039457"));
        assert!(from_chain_amount(U256::MAX).is_err());
    }
}
