//! Collateral registry
//!
//! Fixed at construction: the listed tokens, their USD price feeds and their
//! decimals. Listing order is kept, valuation walks tokens in that order.

use pegbank_core::TokenId;
use pegbank_oracle::PriceFeed;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConfigError, LedgerError};
use crate::token::CollateralToken;

/// A listed collateral token and the feed that prices it
#[derive(Clone)]
pub struct AssetConfig {
    pub token_id: TokenId,
    pub token: Arc<dyn CollateralToken>,
    pub price_feed: Arc<dyn PriceFeed>,
    pub decimals: u8,
}

impl fmt::Debug for AssetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetConfig")
            .field("token_id", &self.token_id)
            .field("price_feed", &self.price_feed.description())
            .field("decimals", &self.decimals)
            .finish()
    }
}

/// Immutable set of allowed collateral tokens
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    assets: Vec<AssetConfig>,
    index: HashMap<TokenId, usize>,
}

impl ConfigRegistry {
    /// Pair `tokens[i]` with `feeds[i]`.
    ///
    /// The lists must have equal length and no token may appear twice.
    /// Empty lists give a registry that accepts no collateral.
    pub fn new(
        tokens: Vec<Arc<dyn CollateralToken>>,
        feeds: Vec<Arc<dyn PriceFeed>>,
    ) -> Result<Self, ConfigError> {
        if tokens.len() != feeds.len() {
            return Err(ConfigError::LengthMismatch {
                tokens: tokens.len(),
                feeds: feeds.len(),
            });
        }

        let mut registry = Self::default();
        for (token, price_feed) in tokens.into_iter().zip(feeds) {
            let token_id = token.token_id().clone();
            if registry.index.contains_key(&token_id) {
                return Err(ConfigError::DuplicateToken(token_id));
            }
            registry.index.insert(token_id.clone(), registry.assets.len());
            registry.assets.push(AssetConfig {
                decimals: token.decimals(),
                token_id,
                token,
                price_feed,
            });
        }

        Ok(registry)
    }

    pub fn is_listed(&self, token: &TokenId) -> bool {
        self.index.contains_key(token)
    }

    /// Listing for `token`, or `TokenNotAllowed`
    pub fn asset(&self, token: &TokenId) -> Result<&AssetConfig, LedgerError> {
        self.index
            .get(token)
            .map(|&i| &self.assets[i])
            .ok_or_else(|| LedgerError::TokenNotAllowed(token.clone()))
    }

    pub fn price_feed_of(&self, token: &TokenId) -> Option<Arc<dyn PriceFeed>> {
        self.index
            .get(token)
            .map(|&i| Arc::clone(&self.assets[i].price_feed))
    }

    /// Listed tokens in listing order
    pub fn collateral_tokens(&self) -> Vec<TokenId> {
        self.assets.iter().map(|a| a.token_id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetConfig> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
