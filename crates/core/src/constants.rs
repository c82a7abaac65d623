//! Protocol constants
//!
//! USD values and debt are 18-decimal fixed point. Price feeds report with
//! their own decimals (8 for the reference USD feeds) and are scaled up by
//! `ADDITIONAL_FEED_PRECISION` before use.

use crate::health::HealthFactor;
use primitive_types::U256;

/// 1e18, the fixed-point unit for USD values, debt and health factors
pub const PRECISION: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// 1e10, lifts an 8-decimal feed answer to 18 decimals
pub const ADDITIONAL_FEED_PRECISION: U256 = U256([10_000_000_000, 0, 0, 0]);

/// Decimals of the synthetic debt token and of every USD amount
pub const USD_DECIMALS: u8 = 18;

/// Decimals of the reference USD price feeds
pub const FEED_DECIMALS: u8 = 8;

/// Default decimals for a collateral token that does not say otherwise
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Share of collateral value counted against debt (50/100 = 200% overcollateralized)
pub const LIQUIDATION_THRESHOLD: u32 = 50;
pub const LIQUIDATION_PRECISION: u32 = 100;

/// Extra collateral paid to a liquidator, in percent of the repaid value
pub const LIQUIDATION_BONUS: u32 = 10;
pub const BONUS_PRECISION: u32 = 100;

/// Positions below this health factor may be liquidated
pub const MIN_HEALTH_FACTOR: HealthFactor = HealthFactor::ONE;

/// Maximum age of a price before it is refused (3 hours)
pub const STALENESS_TIMEOUT_SECS: u64 = 3 * 60 * 60;

/// 10^exp as a U256, or None past 10^77
pub fn pow10(exp: u32) -> Option<U256> {
    if exp > 77 {
        None
    } else {
        Some(U256::exp10(exp as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_constants() {
        assert_eq!(PRECISION, U256::exp10(18));
        assert_eq!(ADDITIONAL_FEED_PRECISION, U256::exp10(10));
        assert_eq!(
            pow10(u32::from(USD_DECIMALS - FEED_DECIMALS)),
            Some(ADDITIONAL_FEED_PRECISION)
        );
    }

    #[test]
    fn test_pow10_bounds() {
        assert!(pow10(77).is_some());
        assert!(pow10(78).is_none());
    }
}
