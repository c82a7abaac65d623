//! Journal records

use chrono::{DateTime, Utc};
use pegbank_core::{Address, Amount, TokenId};
use pegbank_ledger::LedgerEvent;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// A state-changing request, as accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(tag = "command", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Mint simulated collateral tokens to a wallet
    Faucet {
        user: Address,
        token: TokenId,
        amount: Amount,
    },

    /// Publish a new feed answer (feed decimals)
    SetPrice { token: TokenId, answer: i128 },

    Deposit {
        user: Address,
        token: TokenId,
        amount: Amount,
    },

    Withdraw {
        user: Address,
        token: TokenId,
        amount: Amount,
    },

    Mint { user: Address, amount: Amount },

    Burn {
        payer: Address,
        on_behalf_of: Address,
        amount: Amount,
    },

    DepositAndMint {
        user: Address,
        token: TokenId,
        collateral: Amount,
        debt: Amount,
    },

    RedeemAndBurn {
        user: Address,
        token: TokenId,
        collateral: Amount,
        debt: Amount,
    },

    Liquidate {
        liquidator: Address,
        target: Address,
        token: TokenId,
        debt_to_cover: Amount,
    },

    /// Move debt tokens between wallets
    TransferDebt {
        from: Address,
        to: Address,
        amount: Amount,
    },
}

/// One committed command and its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    pub prev_hash: String,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub command: Command,
    /// Ledger events emitted by the engine; empty for wallet-only commands
    #[serde(default)]
    pub events: Vec<LedgerEvent>,
}
