//! Engine errors

use pegbank_ledger::{ConfigError, LedgerError};
use pegbank_oracle::OracleError;
use pegbank_risk::RiskError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Reentrant call: another operation is in progress")]
    Reentrant,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Risk(RiskError),
}

impl From<RiskError> for EngineError {
    fn from(err: RiskError) -> Self {
        match err {
            RiskError::Oracle(e) => EngineError::Oracle(e),
            RiskError::Ledger(e) => EngineError::Ledger(e),
            other => EngineError::Risk(other),
        }
    }
}
