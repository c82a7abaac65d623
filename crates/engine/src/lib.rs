//! PegBank Collateral Engine
//!
//! Owns every position and the debt token's mint authority. Each mutating
//! operation is all-or-nothing: positions are staged, health factors are
//! checked against the staged state, external token movements are settled
//! with compensation on failure, and only then is the new state committed.
//!
//! # Example
//! ```ignore
//! let engine = CollateralEngine::builder()
//!     .address(custody)
//!     .collateral(weth, eth_feed)
//!     .debt_token(stable, authority)
//!     .build()?;
//!
//! engine.deposit_and_mint(&alice, &weth_id, Amount::wad(10), Amount::wad(5_000))?;
//! ```

pub mod engine;
pub mod error;
pub mod guard;
mod tx;

pub use engine::{CollateralEngine, CollateralEngineBuilder, Receipt};
pub use error::EngineError;
pub use guard::{Entered, ReentrancyGuard};
