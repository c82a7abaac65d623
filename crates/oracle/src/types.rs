//! Core oracle types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::OracleError;

/// One price report from a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRound {
    /// Raw answer in the feed's own decimals (signed, as feeds report it)
    pub answer: i128,
    /// Decimal places of `answer`
    pub decimals: u8,
    /// When the feed last updated this answer
    pub updated_at: DateTime<Utc>,
    /// Source of the price (e.g., "mock", "chainlink")
    pub source: String,
}

impl PriceRound {
    pub fn new(answer: i128, decimals: u8, updated_at: DateTime<Utc>) -> Self {
        Self {
            answer,
            decimals,
            updated_at,
            source: "unknown".to_string(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Age of the round at `now`; rounds stamped in the future count as fresh
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.updated_at)
            .max(Duration::zero())
    }

    /// Check if the round is older than `max_age_secs`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age_secs: u64) -> bool {
        self.age(now).num_seconds() > max_age_secs as i64
    }
}

/// Price feed capability - one feed per collateral token
///
/// Implementations can be:
/// - MockFeed: settable prices for tests and simulation
/// - an aggregator client reading an external USD feed
pub trait PriceFeed: Send + Sync {
    /// Human-readable feed name (e.g., "ETH / USD")
    fn description(&self) -> &str;

    /// Latest reported round
    fn latest_round(&self) -> Result<PriceRound, OracleError>;
}
