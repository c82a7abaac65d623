//! Identities - Account addresses and collateral token ids
//!
//! Both are case-insensitive on input and stored uppercase, so `alice` and
//! `ALICE` name the same position.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing identities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Empty identifier")]
    Empty,

    #[error("Identifier too long (max {max} chars): {value}")]
    TooLong { value: String, max: usize },

    #[error("Invalid identifier format: {0}")]
    InvalidFormat(String),
}

fn normalize(raw: &str, max: usize, extra: &[char]) -> Result<String, IdError> {
    let s = raw.trim().to_uppercase();

    if s.is_empty() {
        return Err(IdError::Empty);
    }

    if s.len() > max {
        return Err(IdError::TooLong { value: s, max });
    }

    if !s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || extra.contains(&c))
    {
        return Err(IdError::InvalidFormat(s));
    }

    Ok(s)
}

/// Identity of a position holder, liquidator, or the engine's own custody.
///
/// # Examples
/// ```
/// use pegbank_core::Address;
///
/// let alice: Address = "alice".parse().unwrap();
/// assert_eq!(alice.as_str(), "ALICE");
/// assert!("not an address".parse::<Address>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const MAX_LEN: usize = 64;

    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
        normalize(raw.as_ref(), Self::MAX_LEN, &['_', '-']).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Collateral token symbol (WETH, WBTC, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId(String);

impl TokenId {
    pub const MAX_LEN: usize = 10;

    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
        normalize(raw.as_ref(), Self::MAX_LEN, &[]).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_id_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = IdError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> Self {
                id.0
            }
        }
    };
}

string_id_impls!(Address);
string_id_impls!(TokenId);
