//! Mock price feed for tests and simulation
//!
//! Holds a single settable round; the answer and its timestamp are set
//! independently so tests can age a price without changing it.

use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};

use crate::error::OracleError;
use crate::types::{PriceFeed, PriceRound};

/// Settable price feed
pub struct MockFeed {
    description: String,
    round: RwLock<PriceRound>,
    outage: RwLock<Option<String>>,
}

impl MockFeed {
    pub fn new(
        description: impl Into<String>,
        decimals: u8,
        answer: i128,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            description: description.into(),
            round: RwLock::new(PriceRound::new(answer, decimals, updated_at).with_source("mock")),
            outage: RwLock::new(None),
        }
    }

    /// Report a new answer as of `updated_at`
    pub fn set_answer(&self, answer: i128, updated_at: DateTime<Utc>) {
        let mut round = self.round.write().unwrap_or_else(PoisonError::into_inner);
        round.answer = answer;
        round.updated_at = updated_at;
    }

    /// Re-stamp the current answer without changing it
    pub fn set_updated_at(&self, updated_at: DateTime<Utc>) {
        let mut round = self.round.write().unwrap_or_else(PoisonError::into_inner);
        round.updated_at = updated_at;
    }

    /// Make `latest_round` fail (Some) or recover (None)
    pub fn set_unavailable(&self, reason: Option<String>) {
        *self.outage.write().unwrap_or_else(PoisonError::into_inner) = reason;
    }

    pub fn current(&self) -> PriceRound {
        self.round
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PriceFeed for MockFeed {
    fn description(&self) -> &str {
        &self.description
    }

    fn latest_round(&self) -> Result<PriceRound, OracleError> {
        if let Some(reason) = self
            .outage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(OracleError::Unavailable {
                feed: self.description.clone(),
                reason,
            });
        }
        Ok(self.current())
    }
}
