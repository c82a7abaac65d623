//! Ledger errors

use pegbank_core::{Address, Amount, TokenId};
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Token {0} is not an allowed collateral")]
    TokenNotAllowed(TokenId),

    #[error("Insufficient {token} collateral for {user}: available {available}, requested {requested}")]
    InsufficientCollateral {
        user: Address,
        token: TokenId,
        available: Amount,
        requested: Amount,
    },

    #[error("Insufficient debt for {user}: minted {available}, requested {requested}")]
    InsufficientDebt {
        user: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    // === External settlement ===

    #[error("Transfer of {amount} {token} from {from} to {to} failed")]
    TransferFailed {
        token: TokenId,
        from: Address,
        to: Address,
        amount: Amount,
    },

    #[error("Mint of {amount} debt tokens to {recipient} failed")]
    MintFailed { recipient: Address, amount: Amount },

    #[error("Pulling {amount} debt tokens from {payer} failed")]
    BurnTransferFailed { payer: Address, amount: Amount },

    #[error("Burn of {amount} debt tokens failed")]
    BurnFailed { amount: Amount },

    #[error("Could not undo {effect} after failure: {cause}")]
    CompensationFailed {
        effect: String,
        cause: Box<LedgerError>,
    },
}

/// Errors building the collateral registry or binding the debt token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Token and price feed lists differ in length: {tokens} tokens, {feeds} feeds")]
    LengthMismatch { tokens: usize, feeds: usize },

    #[error("Token {0} listed more than once")]
    DuplicateToken(TokenId),

    #[error("Mint authority is held by {holder}, engine custody is {engine}")]
    AuthorityMismatch { holder: Address, engine: Address },

    #[error("Debt token {0} does not accept the supplied mint authority")]
    AuthorityRejected(String),

    #[error("Missing {0}")]
    Missing(&'static str),
}
