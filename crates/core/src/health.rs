//! HealthFactor - 18-decimal fixed-point solvency ratio
//!
//! A position with no debt has no liquidation risk; that case is the
//! `HealthFactor::MAX` sentinel rather than a division by zero.

use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::{Amount, AmountError};
use crate::constants::USD_DECIMALS;

/// Risk-adjusted collateral value over debt, scaled by 1e18.
///
/// # Example
/// ```
/// use pegbank_core::HealthFactor;
///
/// assert!(HealthFactor::ZERO < HealthFactor::ONE);
/// assert!(HealthFactor::MAX.is_max());
/// assert_eq!(HealthFactor::ONE.to_string(), "1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HealthFactor(U256);

impl HealthFactor {
    /// No collateral backing the debt
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// 1.0, the liquidation boundary
    pub const ONE: Self = Self(U256([1_000_000_000_000_000_000, 0, 0, 0]));

    /// No debt outstanding
    pub const MAX: Self = Self(U256::MAX);

    #[inline]
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_max(&self) -> bool {
        self.0 == U256::MAX
    }

    /// Decimal view for display; None for the MAX sentinel
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.is_max() {
            return None;
        }
        Amount::new(self.0).to_decimal(USD_DECIMALS)
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(value) => write!(f, "{}", value),
            None if self.is_max() => write!(f, "MAX"),
            None => write!(f, "{}e-18", self.0),
        }
    }
}

impl TryFrom<String> for HealthFactor {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "MAX" {
            return Ok(Self::MAX);
        }
        value.parse::<Amount>().map(|a| Self(a.value()))
    }
}

impl From<HealthFactor> for String {
    fn from(hf: HealthFactor) -> Self {
        if hf.is_max() {
            "MAX".to_string()
        } else {
            hf.0.to_string()
        }
    }
}
