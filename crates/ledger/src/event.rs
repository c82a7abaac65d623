//! Ledger events - what a committed operation changed
//!
//! Events are emitted only after the operation's state and external effects
//! have been committed, in the order the changes were applied. Replaying them
//! through `PositionBook::apply_event` rebuilds the book.

use pegbank_core::{Address, Amount, HealthFactor, TokenId};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    CollateralDeposited {
        user: Address,
        token: TokenId,
        amount: Amount,
    },

    /// Collateral leaving `from`'s position, paid out to `to`.
    /// `from == to` for a plain withdrawal.
    CollateralRedeemed {
        from: Address,
        to: Address,
        token: TokenId,
        amount: Amount,
    },

    DebtMinted {
        user: Address,
        amount: Amount,
    },

    /// Debt of `on_behalf_of` repaid with tokens supplied by `payer`
    DebtBurned {
        on_behalf_of: Address,
        payer: Address,
        amount: Amount,
    },

    /// Summary of a liquidation; the balance changes are carried by the
    /// `CollateralRedeemed` and `DebtBurned` events emitted with it
    PositionLiquidated {
        target: Address,
        liquidator: Address,
        token: TokenId,
        debt_covered: Amount,
        collateral_seized: Amount,
        bonus: Amount,
        health_before: HealthFactor,
        health_after: HealthFactor,
    },
}

impl LedgerEvent {
    /// Position whose state the event changes
    pub fn subject(&self) -> &Address {
        match self {
            LedgerEvent::CollateralDeposited { user, .. } => user,
            LedgerEvent::CollateralRedeemed { from, .. } => from,
            LedgerEvent::DebtMinted { user, .. } => user,
            LedgerEvent::DebtBurned { on_behalf_of, .. } => on_behalf_of,
            LedgerEvent::PositionLiquidated { target, .. } => target,
        }
    }
}
