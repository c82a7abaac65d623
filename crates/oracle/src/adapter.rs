//! Staleness-enforcing price lookup

use chrono::{DateTime, Utc};
use pegbank_core::constants::{pow10, STALENESS_TIMEOUT_SECS, USD_DECIMALS};
use pegbank_core::TokenId;
use primitive_types::U256;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::OracleError;
use crate::types::{PriceFeed, PriceRound};

/// A price that passed the freshness check, normalized to 18 decimals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshPrice {
    pub token: TokenId,
    /// USD per whole token, 18 decimals
    pub price: U256,
    /// The round it came from
    pub round: PriceRound,
}

/// Scale a raw feed answer to 18 decimals.
///
/// An 8-decimal answer is multiplied by 1e10; feeds with more than 18
/// decimals are divided down. None on overflow.
pub fn normalize_price(answer: U256, decimals: u8) -> Option<U256> {
    match decimals.cmp(&USD_DECIMALS) {
        Ordering::Less => answer.checked_mul(pow10(u32::from(USD_DECIMALS - decimals))?),
        Ordering::Equal => Some(answer),
        Ordering::Greater => Some(answer / pow10(u32::from(decimals - USD_DECIMALS))?),
    }
}

/// Wraps raw feeds and refuses prices older than the timeout
#[derive(Clone)]
pub struct OracleAdapter {
    timeout_secs: u64,
    clock: Arc<dyn Clock>,
}

impl OracleAdapter {
    /// Adapter with the default 3 hour timeout
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_timeout(clock, STALENESS_TIMEOUT_SECS)
    }

    pub fn with_timeout(clock: Arc<dyn Clock>, timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            clock,
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Latest price for `token` from `feed`, or an error if it is stale or unusable
    pub fn get_fresh_price(
        &self,
        token: &TokenId,
        feed: &dyn PriceFeed,
    ) -> Result<FreshPrice, OracleError> {
        let round = feed.latest_round()?;

        if round.answer <= 0 {
            return Err(OracleError::InvalidPrice {
                token: token.clone(),
                reason: format!("non-positive answer {}", round.answer),
            });
        }

        let now = self.clock.now();
        if round.is_stale(now, self.timeout_secs) {
            let age_secs = round.age(now).num_seconds();
            tracing::warn!(
                token = %token,
                feed = feed.description(),
                updated_at = %round.updated_at,
                age_secs,
                "Refusing stale price"
            );
            return Err(OracleError::StalePrice {
                token: token.clone(),
                updated_at: round.updated_at,
                age_secs,
                timeout_secs: self.timeout_secs,
            });
        }

        let price = normalize_price(U256::from(round.answer.unsigned_abs()), round.decimals)
            .filter(|p| !p.is_zero())
            .ok_or_else(|| OracleError::InvalidPrice {
                token: token.clone(),
                reason: format!(
                    "answer {} with {} decimals does not normalize",
                    round.answer, round.decimals
                ),
            })?;

        Ok(FreshPrice {
            token: token.clone(),
            price,
            round,
        })
    }
}

impl std::fmt::Debug for OracleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleAdapter")
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}
