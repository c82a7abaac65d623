//! PegBank RPC - CLI orchestrator
//!
//! Wires the collateral engine to a simulated world (in-memory tokens and
//! settable price feeds) whose history lives in the JSONL journal.

pub mod commands;
pub mod config;
pub mod context;

pub use config::{AppConfig, AssetSpec};
pub use context::{AppContext, AppError};
