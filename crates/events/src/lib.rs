//! PegBank Events - Hash-chained JSONL journal
//!
//! Every committed command is appended as one JSON line together with the
//! ledger events it produced. The journal is the source of truth: positions
//! and simulated token balances are rebuilt by replaying it.

pub mod error;
pub mod hash;
pub mod reader;
pub mod record;
pub mod store;

pub use error::EventError;
pub use hash::{calculate_record_hash, verify_chain, ChainError, GENESIS_HASH};
pub use reader::JournalReader;
pub use record::{Command, JournalRecord};
pub use store::JournalStore;
