//! PegBank Ledger - Position bookkeeping and asset settlement
//!
//! All collateral and debt state lives here. Nothing outside the engine
//! mutates a `PositionBook` directly; operations stage their changes in a
//! `Changeset` and commit only after every check and external effect succeeds.
//!
//! # Key Types
//! - `ConfigRegistry`: Listed collateral tokens, their price feeds and decimals
//! - `Position`: One user's collateral balances and minted debt
//! - `PositionBook` / `Changeset`: Committed state and a staged overlay on it
//! - `Settlement`: Ordered external transfers with reverse-order compensation
//! - `LedgerEvent`: State-change records emitted by committed operations

pub mod error;
pub mod event;
pub mod memory;
pub mod position;
pub mod registry;
pub mod settlement;
pub mod token;

pub use error::{ConfigError, LedgerError};
pub use event::LedgerEvent;
pub use memory::{SimpleToken, StableToken};
pub use position::{Changeset, Position, PositionBook};
pub use registry::{AssetConfig, ConfigRegistry};
pub use settlement::{Effect, Settlement};
pub use token::{CollateralToken, DebtToken, MintAuthority};
