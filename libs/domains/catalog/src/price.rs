//! Price conversion between the decimal wire format and integer minor units.
//!
//! Prices are stored as whole cents and rendered as decimal strings with
//! exactly two fractional digits. Digits past the second decimal place are
//! truncated, never rounded.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{CatalogError, CatalogResult};

const FIELD: &str = "price";

/// Parse a decimal price such as `"10.50"` into minor units (`1050`).
pub fn to_minor_units(input: &str) -> CatalogResult<i64> {
    let trimmed = input.trim();
    let value = Decimal::from_str(trimmed).map_err(|_| {
        CatalogError::validation(
            FIELD,
            trimmed,
            format!("The price must be a decimal number, got {trimmed}"),
        )
    })?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(CatalogError::validation(
            FIELD,
            trimmed,
            format!("The price cannot be negative, got {trimmed}"),
        ));
    }

    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.trunc().to_i64())
        .ok_or_else(|| {
            CatalogError::validation(
                FIELD,
                trimmed,
                format!("The price is out of range, got {trimmed}"),
            )
        })
}

/// Render minor units as a two-decimal string (`1050` → `"10.50"`).
pub fn to_display(minor_units: i64) -> String {
    Decimal::new(minor_units, 2).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_two_decimals() {
        for input in ["0.00", "0.05", "1.10", "10.00", "19.99", "123456.78"] {
            let cents = to_minor_units(input).unwrap();
            assert_eq!(to_display(cents), input, "round trip of {input}");
        }
    }

    #[test]
    fn test_fewer_decimals_are_padded() {
        assert_eq!(to_minor_units("10").unwrap(), 1000);
        assert_eq!(to_display(to_minor_units("10").unwrap()), "10.00");
        assert_eq!(to_display(to_minor_units("2.5").unwrap()), "2.50");
    }

    #[test]
    fn test_third_decimal_is_truncated() {
        assert_eq!(to_minor_units("10.001").unwrap(), 1000);
        assert_eq!(to_minor_units("10.009").unwrap(), 1000);
        assert_eq!(to_display(to_minor_units("10.001").unwrap()), "10.00");
    }

    #[test]
    fn test_negative_price_rejected() {
        let err = to_minor_units("-1.00").unwrap_err();
        match err {
            CatalogError::Validation { field, message, .. } => {
                assert_eq!(field, "price");
                assert!(message.contains("negative"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(to_minor_units("-0.00").unwrap(), 0);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            to_minor_units("ten dollars"),
            Err(CatalogError::Validation { .. })
        ));
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert_eq!(to_minor_units("  4.20 ").unwrap(), 420);
    }
}
