//! Oracle error types

use chrono::{DateTime, Utc};
use pegbank_core::TokenId;
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// No feed is bound to the token
    #[error("No price feed for {token}")]
    FeedNotFound { token: TokenId },

    /// Price data is older than the staleness timeout
    #[error("Stale price for {token}: updated at {updated_at} ({age_secs}s ago), timeout is {timeout_secs}s")]
    StalePrice {
        token: TokenId,
        updated_at: DateTime<Utc>,
        age_secs: i64,
        timeout_secs: u64,
    },

    /// Price data is unusable (non-positive, overflowing)
    #[error("Invalid price for {token}: {reason}")]
    InvalidPrice { token: TokenId, reason: String },

    /// The feed could not produce a round at all
    #[error("Price feed {feed} unavailable: {reason}")]
    Unavailable { feed: String, reason: String },
}
