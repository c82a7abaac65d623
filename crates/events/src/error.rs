//! Journal errors

use thiserror::Error;

use crate::hash::ChainError;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid journal file: {0}")]
    InvalidFile(String),

    #[error("Journal integrity: {0}")]
    Chain(#[from] ChainError),
}
