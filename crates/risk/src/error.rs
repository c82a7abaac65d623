//! Risk engine errors

use pegbank_core::{Address, HealthFactor};
use pegbank_ledger::LedgerError;
use pegbank_oracle::OracleError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error("Health factor of {user} would be {health_factor}, below the minimum")]
    HealthFactorBelowThreshold {
        user: Address,
        health_factor: HealthFactor,
    },

    #[error("Position of {user} is healthy ({health_factor}) and cannot be liquidated")]
    NotLiquidatable {
        user: Address,
        health_factor: HealthFactor,
    },

    #[error("Liquidation did not improve health factor of {user}: {before} -> {after}")]
    HealthFactorNotImproved {
        user: Address,
        before: HealthFactor,
        after: HealthFactor,
    },

    #[error("Invalid risk parameters: {0}")]
    InvalidParameters(String),

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
