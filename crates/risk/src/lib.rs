//! PegBank Risk Engine - Solvency checks
//!
//! Values collateral in USD, computes health factors and plans liquidations.
//! Nothing here mutates positions; the engine crate decides what to commit
//! based on the answers given here.

pub mod error;
pub mod health;
pub mod liquidation;
pub mod params;

pub use error::RiskError;
pub use health::{calculate_health_factor, token_amount_at, usd_value_at, HealthFactorEngine};
pub use liquidation::{LiquidationEngine, LiquidationPlan};
pub use params::RiskParameters;
