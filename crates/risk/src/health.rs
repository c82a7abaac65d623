//! Valuation and health factors
//!
//! All arithmetic is on 256-bit integers with 18-decimal USD values. Prices
//! come from the oracle adapter already normalized to 18 decimals, so a
//! token's USD value is `price * amount / 10^token_decimals`.

use pegbank_core::constants::{pow10, PRECISION};
use pegbank_core::{Amount, HealthFactor, TokenId};
use pegbank_ledger::{ConfigRegistry, Position};
use pegbank_oracle::{FreshPrice, OracleAdapter};
use primitive_types::U256;
use std::sync::Arc;

use crate::error::RiskError;
use crate::params::RiskParameters;

/// `(collateral_value * threshold / precision) * 1e18 / total_debt`,
/// or `MAX` when there is no debt.
pub fn calculate_health_factor(
    total_debt: Amount,
    collateral_value_usd: Amount,
    params: &RiskParameters,
) -> Result<HealthFactor, RiskError> {
    if total_debt.is_zero() {
        return Ok(HealthFactor::MAX);
    }

    let adjusted = collateral_value_usd
        .value()
        .checked_mul(U256::from(params.liquidation_threshold))
        .ok_or(RiskError::Overflow("health factor"))?
        / U256::from(params.liquidation_precision);

    let ratio = adjusted
        .checked_mul(PRECISION)
        .ok_or(RiskError::Overflow("health factor"))?
        / total_debt.value();

    Ok(HealthFactor::from_raw(ratio))
}

/// USD value of `amount` base units at an 18-decimal `price`
pub fn usd_value_at(price: U256, amount: Amount, token_decimals: u8) -> Result<Amount, RiskError> {
    let scale = pow10(u32::from(token_decimals)).ok_or(RiskError::Overflow("usd value"))?;
    price
        .checked_mul(amount.value())
        .map(|v| Amount::new(v / scale))
        .ok_or(RiskError::Overflow("usd value"))
}

/// Base units of a token worth `usd` at an 18-decimal `price`
pub fn token_amount_at(price: U256, usd: Amount, token_decimals: u8) -> Result<Amount, RiskError> {
    let scale = pow10(u32::from(token_decimals)).ok_or(RiskError::Overflow("token amount"))?;
    if price.is_zero() {
        return Err(RiskError::Overflow("token amount"));
    }
    usd.value()
        .checked_mul(scale)
        .map(|v| Amount::new(v / price))
        .ok_or(RiskError::Overflow("token amount"))
}

/// Prices positions against the registry's feeds
#[derive(Debug, Clone)]
pub struct HealthFactorEngine {
    registry: Arc<ConfigRegistry>,
    oracle: OracleAdapter,
    params: RiskParameters,
}

impl HealthFactorEngine {
    pub fn new(registry: Arc<ConfigRegistry>, oracle: OracleAdapter, params: RiskParameters) -> Self {
        Self {
            registry,
            oracle,
            params,
        }
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    pub fn oracle(&self) -> &OracleAdapter {
        &self.oracle
    }

    pub fn params(&self) -> &RiskParameters {
        &self.params
    }

    /// Fresh price of a listed token
    pub fn price_of(&self, token: &TokenId) -> Result<FreshPrice, RiskError> {
        let asset = self.registry.asset(token)?;
        Ok(self
            .oracle
            .get_fresh_price(token, asset.price_feed.as_ref())?)
    }

    pub fn usd_value(&self, token: &TokenId, amount: Amount) -> Result<Amount, RiskError> {
        let decimals = self.registry.asset(token)?.decimals;
        let price = self.price_of(token)?;
        usd_value_at(price.price, amount, decimals)
    }

    pub fn token_amount_from_usd(&self, token: &TokenId, usd: Amount) -> Result<Amount, RiskError> {
        let decimals = self.registry.asset(token)?.decimals;
        let price = self.price_of(token)?;
        token_amount_at(price.price, usd, decimals)
    }

    /// Sum of USD values of the position's collateral, in listing order.
    /// Tokens with a zero balance are not priced.
    pub fn account_collateral_value(&self, position: &Position) -> Result<Amount, RiskError> {
        let mut total = Amount::ZERO;
        for asset in self.registry.iter() {
            let balance = position.collateral_of(&asset.token_id);
            if balance.is_zero() {
                continue;
            }
            let value = self.usd_value(&asset.token_id, balance)?;
            total = total
                .checked_add(&value)
                .ok_or(RiskError::Overflow("collateral value"))?;
        }
        Ok(total)
    }

    pub fn health_factor(&self, position: &Position) -> Result<HealthFactor, RiskError> {
        let collateral_value = self.account_collateral_value(position)?;
        calculate_health_factor(position.debt(), collateral_value, &self.params)
    }

    pub fn is_healthy(&self, health_factor: HealthFactor) -> bool {
        health_factor >= self.params.min_health_factor
    }
}
