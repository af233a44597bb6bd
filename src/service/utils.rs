//! Amount conversion helpers.
//!
//! All pipeline arithmetic happens on U256 smallest-unit integers; Decimal
//! appears only at the config boundary (parsing human-readable amounts) and
//! in logs.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a human-readable amount (e.g. "0.003") into the token's smallest
/// unit.
///
/// # Examples
/// - "0.003" with 18 decimals -> 3000000000000000
/// - "10" with 6 decimals -> 10000000
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, String> {
    if let Ok(decimal_amount) = Decimal::from_str(amount) {
        let mut multiplier = Decimal::from(1);
        for _ in 0..decimals {
            multiplier *= Decimal::from(10);
        }

        let smallest_unit = decimal_amount * multiplier;

        // Truncate any sub-unit dust rather than rounding up
        let amount_str = smallest_unit.to_string();
        let integer_part = amount_str.split('.').next().unwrap_or("0");

        U256::from_str(integer_part).map_err(|e| format!("Failed to parse amount: {e}"))
    } else {
        // Not a decimal; assume the caller already supplied smallest units
        U256::from_str(amount).map_err(|e| format!("Invalid amount format: {e}"))
    }
}

/// Format a smallest-unit balance as a human-readable string with trailing
/// zeros removed. Display/logging only.
pub fn format_balance(balance: U256, decimals: u8) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = balance / divisor;
    let remainder = balance % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_part = remainder.to_string();
        let padded = format!("{:0>width$}", decimal_part, width = decimals as usize);
        let trimmed = padded.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{trimmed}")
        }
    }
}

/// Realized price impact of an execution versus its quote, in percent.
/// Positive when the actual output fell short of the quoted output,
/// negative when execution beat the quote.
pub fn realized_impact_pct(expected: U256, actual: U256) -> Decimal {
    if expected.is_zero() {
        return Decimal::ZERO;
    }

    let expected_dec = match Decimal::from_str(&expected.to_string()) {
        Ok(d) => d,
        Err(_) => return Decimal::ZERO,
    };
    let actual_dec = match Decimal::from_str(&actual.to_string()) {
        Ok(d) => d,
        Err(_) => return Decimal::ZERO,
    };

    (expected_dec - actual_dec) / expected_dec * Decimal::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_native_should_work() {
        let amount = parse_amount("0.003", 18).unwrap();
        assert_eq!(amount, U256::from_str("3000000000000000").unwrap());
    }

    #[test]
    fn test_parse_amount_stable_should_work() {
        // 10 units of a 6-decimal stable token
        let amount = parse_amount("10", 6).unwrap();
        assert_eq!(amount, U256::from(10_000_000u64));
    }

    #[test]
    fn test_parse_amount_truncates_dust() {
        // Sub-unit precision is truncated, never rounded up
        let amount = parse_amount("0.0000005", 6).unwrap();
        assert_eq!(amount, U256::ZERO);
    }

    #[test]
    fn test_parse_amount_integer_is_scaled() {
        let amount = parse_amount("10000000", 6).unwrap();
        assert_eq!(amount, U256::from(10_000_000_000_000u64));
    }

    #[test]
    fn test_format_balance_native_should_work() {
        let wei = U256::from_str("5800000000000000").unwrap();
        assert_eq!(format_balance(wei, 18), "0.0058");
    }

    #[test]
    fn test_format_balance_whole_number_should_work() {
        let raw = U256::from(10_000_000u64);
        assert_eq!(format_balance(raw, 6), "10");
    }

    #[test]
    fn test_realized_impact_shortfall_is_positive() {
        let expected = U256::from(1000u64);
        let actual = U256::from(990u64);
        assert_eq!(realized_impact_pct(expected, actual), Decimal::from(1));
    }

    #[test]
    fn test_realized_impact_overdelivery_is_negative() {
        let expected = U256::from(1000u64);
        let actual = U256::from(1010u64);
        assert_eq!(realized_impact_pct(expected, actual), Decimal::from(-1));
    }

    #[test]
    fn test_realized_impact_zero_expected() {
        assert_eq!(
            realized_impact_pct(U256::ZERO, U256::from(5u64)),
            Decimal::ZERO
        );
    }
}
