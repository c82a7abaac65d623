//! Risk parameters

use pegbank_core::constants::{
    LIQUIDATION_BONUS, LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD, MIN_HEALTH_FACTOR,
};
use pegbank_core::HealthFactor;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Collateralization and liquidation settings, fixed at engine construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Share of collateral value (out of `liquidation_precision`) that may back debt
    #[serde(default = "default_threshold")]
    pub liquidation_threshold: u32,

    #[serde(default = "default_precision")]
    pub liquidation_precision: u32,

    /// Liquidator bonus in percent of the repaid value
    #[serde(default = "default_bonus")]
    pub liquidation_bonus: u32,

    #[serde(default = "default_min_health_factor")]
    pub min_health_factor: HealthFactor,
}

fn default_threshold() -> u32 {
    LIQUIDATION_THRESHOLD
}

fn default_precision() -> u32 {
    LIQUIDATION_PRECISION
}

fn default_bonus() -> u32 {
    LIQUIDATION_BONUS
}

fn default_min_health_factor() -> HealthFactor {
    MIN_HEALTH_FACTOR
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            liquidation_threshold: default_threshold(),
            liquidation_precision: default_precision(),
            liquidation_bonus: default_bonus(),
            min_health_factor: default_min_health_factor(),
        }
    }
}

impl RiskParameters {
    pub fn validate(&self) -> Result<(), RiskError> {
        if self.liquidation_precision == 0 {
            return Err(RiskError::InvalidParameters(
                "liquidation_precision must be positive".to_string(),
            ));
        }
        if self.liquidation_threshold == 0 || self.liquidation_threshold > self.liquidation_precision
        {
            return Err(RiskError::InvalidParameters(format!(
                "liquidation_threshold {} must be in 1..={}",
                self.liquidation_threshold, self.liquidation_precision
            )));
        }
        if self.min_health_factor.is_max() {
            return Err(RiskError::InvalidParameters(
                "min_health_factor cannot be MAX".to_string(),
            ));
        }
        Ok(())
    }
}
