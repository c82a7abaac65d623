//! Amount - Non-negative integer wrapper for on-ledger quantities
//!
//! Collateral balances, debt and USD values are all held in their asset's
//! smallest unit as 256-bit unsigned integers. Negative amounts cannot be
//! represented; conversions from human-readable decimals are checked.

use crate::constants::pow10;
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when working with amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Amount {value} has more than {decimals} decimal places")]
    TooPrecise { value: Decimal, decimals: u8 },

    #[error("Amount overflows 256 bits")]
    Overflow,

    #[error("Invalid amount: {0}")]
    InvalidFormat(String),
}

/// A non-negative quantity in an asset's smallest unit.
///
/// # Example
/// ```
/// use pegbank_core::Amount;
/// use rust_decimal::Decimal;
///
/// // 1.5 tokens of an 18-decimal asset
/// let amount = Amount::from_decimal(Decimal::new(15, 1), 18).unwrap();
/// assert_eq!(amount.to_string(), "1500000000000000000");
///
/// // Negative amounts are rejected
/// assert!(Amount::from_decimal(Decimal::new(-1, 0), 18).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(U256);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// Wrap a raw base-unit value
    #[inline]
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Whole units of an 18-decimal asset (debt token, USD values)
    pub fn wad(whole: u64) -> Self {
        Self(U256::from(whole) * U256::from(1_000_000_000_000_000_000u64))
    }

    /// Convert a human-readable decimal into base units.
    ///
    /// Rejects negative values and values with more fractional digits than
    /// the asset supports.
    pub fn from_decimal(value: Decimal, decimals: u8) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::NegativeAmount(value));
        }

        let normalized = value.normalize();
        let scale = normalized.scale();
        if scale > u32::from(decimals) {
            return Err(AmountError::TooPrecise { value, decimals });
        }

        let mantissa = U256::from(normalized.mantissa().unsigned_abs());
        let factor = pow10(u32::from(decimals) - scale).ok_or(AmountError::Overflow)?;
        mantissa
            .checked_mul(factor)
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Render as a human-readable decimal.
    ///
    /// Values too large for `Decimal` lose trailing fractional digits;
    /// `None` only when even the integer part does not fit.
    pub fn to_decimal(&self, decimals: u8) -> Option<Decimal> {
        let ten = U256::from(10u8);
        let mut value = self.0;
        let mut scale = u32::from(decimals);

        while scale > 28 || value.bits() > 96 {
            if scale == 0 {
                return None;
            }
            value = value / ten;
            scale -= 1;
        }

        Decimal::try_from_i128_with_scale(value.low_u128() as i128, scale)
            .ok()
            .map(|d| d.normalize())
    }

    /// Get the inner base-unit value
    #[inline]
    pub const fn value(&self) -> U256 {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition - returns None on overflow
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction - returns None if result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_dec_str(s.trim())
            .map(Self)
            .map_err(|_| AmountError::InvalidFormat(s.to_string()))
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0.to_string()
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_decimal_whole() {
        let amount = Amount::from_decimal(dec!(10), 18).unwrap();
        assert_eq!(amount, Amount::wad(10));
    }

    #[test]
    fn test_from_decimal_fraction() {
        let amount = Amount::from_decimal(dec!(0.25), 8).unwrap();
        assert_eq!(amount, Amount::from(25_000_000u64));
    }

    #[test]
    fn test_from_decimal_trailing_zeros_ignored() {
        // 1.500 normalizes to 1.5, which fits in 1 decimal
        let amount = Amount::from_decimal(dec!(1.500), 1).unwrap();
        assert_eq!(amount, Amount::from(15u64));
    }

    #[test]
    fn test_negative_rejected() {
        let result = Amount::from_decimal(dec!(-1), 18);
        assert!(matches!(result, Err(AmountError::NegativeAmount(_))));
    }

    #[test]
    fn test_too_precise_rejected() {
        let result = Amount::from_decimal(dec!(0.001), 2);
        assert!(matches!(result, Err(AmountError::TooPrecise { .. })));
    }

    #[test]
    fn test_to_decimal() {
        let amount = Amount::from(1_500_000_000_000_000_000u64);
        assert_eq!(amount.to_decimal(18), Some(dec!(1.5)));
    }

    #[test]
    fn test_to_decimal_large_value_truncates_fraction() {
        // 1e61 / 1e18 leaves an integer part beyond Decimal's range
        let huge = Amount::new(U256::exp10(61));
        assert_eq!(huge.to_decimal(18), None);

        // 1e30 base units with 18 decimals = 1e12 whole units
        let big = Amount::new(U256::exp10(30));
        assert_eq!(big.to_decimal(18), Some(dec!(1000000000000)));
    }

    #[test]
    fn test_checked_sub_prevents_negative() {
        let a = Amount::from(50u64);
        let b = Amount::from(100u64);
        assert!(a.checked_sub(&b).is_none());
        assert_eq!(b.checked_sub(&a), Some(Amount::from(50u64)));
    }

    #[test]
    fn test_serde_roundtrip() {
        let amount = Amount::wad(12345);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"12345000000000000000000\"");
        let parsed: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(amount, parsed);
    }

    #[test]
    fn test_parse_invalid() {
        let result: Result<Amount, _> = "12ab".parse();
        assert!(matches!(result, Err(AmountError::InvalidFormat(_))));
    }
}
