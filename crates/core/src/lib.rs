//! PegBank Core - Domain types
//!
//! This crate contains the fundamental types used across PegBank:
//! - `Amount`: Non-negative 256-bit quantity in an asset's smallest unit
//! - `Address`, `TokenId`: Validated identities for accounts and collateral tokens
//! - `HealthFactor`: 18-decimal fixed-point solvency ratio with a no-debt sentinel
//! - `constants`: Protocol-wide precision and risk constants

pub mod amount;
pub mod constants;
pub mod health;
pub mod ids;

pub use amount::{Amount, AmountError};
pub use health::HealthFactor;
pub use ids::{Address, IdError, TokenId};
pub use primitive_types::U256;
