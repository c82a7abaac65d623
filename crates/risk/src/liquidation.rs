//! Liquidation planning
//!
//! A position below the minimum health factor can be partially repaid by a
//! third party. The liquidator burns `debt_to_cover` of their own debt
//! tokens and receives the equivalent collateral plus a bonus.

use pegbank_core::constants::BONUS_PRECISION;
use pegbank_core::{Address, Amount, HealthFactor, TokenId};
use primitive_types::U256;

use crate::error::RiskError;
use crate::health::HealthFactorEngine;
use crate::params::RiskParameters;

/// Amounts for one liquidation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationPlan {
    pub token: TokenId,
    /// Debt repaid on the target's behalf (18 decimals)
    pub debt_to_cover: Amount,
    /// Collateral worth exactly `debt_to_cover`
    pub collateral_equivalent: Amount,
    /// Extra collateral paid to the liquidator
    pub bonus: Amount,
    /// `collateral_equivalent + bonus`, taken from the target
    pub total_seized: Amount,
}

/// Liquidation rules
#[derive(Debug, Clone)]
pub struct LiquidationEngine {
    bonus: u32,
    min_health_factor: HealthFactor,
}

impl LiquidationEngine {
    pub fn new(params: &RiskParameters) -> Self {
        Self {
            bonus: params.liquidation_bonus,
            min_health_factor: params.min_health_factor,
        }
    }

    /// Only positions strictly below the minimum health factor can be liquidated
    pub fn ensure_liquidatable(
        &self,
        user: &Address,
        health_factor: HealthFactor,
    ) -> Result<(), RiskError> {
        if health_factor >= self.min_health_factor {
            return Err(RiskError::NotLiquidatable {
                user: user.clone(),
                health_factor,
            });
        }
        Ok(())
    }

    /// Bonus collateral for a given equivalent amount, in percent
    /// regardless of the threshold's precision
    pub fn bonus_for(&self, collateral_equivalent: Amount) -> Result<Amount, RiskError> {
        collateral_equivalent
            .value()
            .checked_mul(U256::from(self.bonus))
            .map(|v| Amount::new(v / U256::from(BONUS_PRECISION)))
            .ok_or(RiskError::Overflow("liquidation bonus"))
    }

    /// Price `debt_to_cover` in `token` and add the bonus
    pub fn plan(
        &self,
        health: &HealthFactorEngine,
        token: &TokenId,
        debt_to_cover: Amount,
    ) -> Result<LiquidationPlan, RiskError> {
        let collateral_equivalent = health.token_amount_from_usd(token, debt_to_cover)?;
        let bonus = self.bonus_for(collateral_equivalent)?;
        let total_seized = collateral_equivalent
            .checked_add(&bonus)
            .ok_or(RiskError::Overflow("liquidation seize"))?;

        Ok(LiquidationPlan {
            token: token.clone(),
            debt_to_cover,
            collateral_equivalent,
            bonus,
            total_seized,
        })
    }

    /// The target must end strictly healthier than it started
    pub fn verify_improved(
        &self,
        user: &Address,
        before: HealthFactor,
        after: HealthFactor,
    ) -> Result<(), RiskError> {
        if after <= before {
            tracing::warn!(
                user = %user,
                before = %before,
                after = %after,
                "Liquidation did not improve health factor"
            );
            return Err(RiskError::HealthFactorNotImproved {
                user: user.clone(),
                before,
                after,
            });
        }
        Ok(())
    }
}
