//! Application configuration
//!
//! Stored as `pegbank.json` in the data directory. Every field has a serde
//! default, so a partial file (or none at all) yields a working setup.

use pegbank_core::constants::{DEFAULT_TOKEN_DECIMALS, FEED_DECIMALS, STALENESS_TIMEOUT_SECS};
use pegbank_core::{Address, Amount, IdError, TokenId};
use pegbank_risk::RiskParameters;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the configuration inside the data directory
pub const CONFIG_FILE: &str = "pegbank.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Custody address of the engine; holds the mint authority
    #[serde(default = "default_engine_address")]
    pub engine_address: String,

    #[serde(default = "default_debt_symbol")]
    pub debt_symbol: String,

    #[serde(default = "default_staleness_timeout_secs")]
    pub staleness_timeout_secs: u64,

    #[serde(default)]
    pub risk: RiskParameters,

    /// Listed collateral, in listing order
    #[serde(default = "default_assets")]
    pub assets: Vec<AssetSpec>,
}

/// One collateral token and its simulated USD feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub symbol: TokenId,

    #[serde(default = "default_token_decimals")]
    pub decimals: u8,

    #[serde(default = "default_feed_decimals")]
    pub feed_decimals: u8,

    /// USD price published by `init`
    pub initial_price: Decimal,
}

impl AssetSpec {
    /// Raw feed answer for a USD price; None unless positive and representable
    pub fn answer_for(&self, price: Decimal) -> Option<i128> {
        if price <= Decimal::ZERO {
            return None;
        }
        let raw = Amount::from_decimal(price, self.feed_decimals).ok()?.value();
        (raw.bits() <= 127).then(|| raw.low_u128() as i128)
    }
}

fn default_engine_address() -> String {
    "PEGBANK_ENGINE".to_string()
}

fn default_debt_symbol() -> String {
    "pUSD".to_string()
}

fn default_staleness_timeout_secs() -> u64 {
    STALENESS_TIMEOUT_SECS
}

fn default_token_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

fn default_feed_decimals() -> u8 {
    FEED_DECIMALS
}

fn default_assets() -> Vec<AssetSpec> {
    let asset = |symbol: &str, decimals: u8, price: i64| {
        TokenId::new(symbol).map(|symbol| AssetSpec {
            symbol,
            decimals,
            feed_decimals: FEED_DECIMALS,
            initial_price: Decimal::new(price, 0),
        })
    };
    [asset("WETH", 18, 2_000), asset("WBTC", 8, 30_000)]
        .into_iter()
        .flatten()
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine_address: default_engine_address(),
            debt_symbol: default_debt_symbol(),
            staleness_timeout_secs: default_staleness_timeout_secs(),
            risk: RiskParameters::default(),
            assets: default_assets(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// `pegbank.json` in `data_path`, or defaults when it does not exist
    pub fn load(data_path: &Path) -> Result<Self, std::io::Error> {
        let path = data_path.join(CONFIG_FILE);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, data_path: &Path) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(data_path)?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(data_path.join(CONFIG_FILE), json)
    }

    pub fn engine_address(&self) -> Result<Address, IdError> {
        Address::new(&self.engine_address)
    }

    pub fn asset(&self, symbol: &TokenId) -> Option<&AssetSpec> {
        self.assets.iter().find(|a| &a.symbol == symbol)
    }
}
