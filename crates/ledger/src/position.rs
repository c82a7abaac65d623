//! Positions - Per-user collateral balances and minted debt
//!
//! `PositionBook` is the committed state. Operations clone the positions
//! they touch into a `Changeset`, mutate the copies, and hand the changeset
//! back to `PositionBook::commit` once everything else has succeeded. A
//! dropped changeset leaves the book untouched.

use pegbank_core::{Address, Amount, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::LedgerError;
use crate::event::LedgerEvent;

/// One user's collateral deposits and outstanding debt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Deposited balance per token; zero balances are not stored
    collateral: BTreeMap<TokenId, Amount>,
    debt: Amount,
}

impl Position {
    pub fn collateral_of(&self, token: &TokenId) -> Amount {
        self.collateral.get(token).copied().unwrap_or_default()
    }

    /// Non-zero collateral balances
    pub fn collateral(&self) -> &BTreeMap<TokenId, Amount> {
        &self.collateral
    }

    pub fn debt(&self) -> Amount {
        self.debt
    }

    pub fn is_empty(&self) -> bool {
        self.debt.is_zero() && self.collateral.is_empty()
    }

    pub fn credit_collateral(&mut self, token: &TokenId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self
            .collateral_of(token)
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("collateral balance"))?;
        if !balance.is_zero() {
            self.collateral.insert(token.clone(), balance);
        }
        Ok(())
    }

    pub fn debit_collateral(
        &mut self,
        owner: &Address,
        token: &TokenId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.collateral_of(token);
        let remaining =
            available
                .checked_sub(&amount)
                .ok_or_else(|| LedgerError::InsufficientCollateral {
                    user: owner.clone(),
                    token: token.clone(),
                    available,
                    requested: amount,
                })?;
        if remaining.is_zero() {
            self.collateral.remove(token);
        } else {
            self.collateral.insert(token.clone(), remaining);
        }
        Ok(())
    }

    pub fn add_debt(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.debt = self
            .debt
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("debt"))?;
        Ok(())
    }

    pub fn sub_debt(&mut self, owner: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.debt = self
            .debt
            .checked_sub(&amount)
            .ok_or_else(|| LedgerError::InsufficientDebt {
                user: owner.clone(),
                available: self.debt,
                requested: amount,
            })?;
        Ok(())
    }
}

/// Committed positions of every user
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: HashMap<Address, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `user`; users that never interacted have an empty one
    pub fn position(&self, user: &Address) -> Position {
        self.get(user).cloned().unwrap_or_default()
    }

    pub fn get(&self, user: &Address) -> Option<&Position> {
        self.positions.get(user)
    }

    pub fn collateral_balance_of(&self, user: &Address, token: &TokenId) -> Amount {
        self.get(user)
            .map(|p| p.collateral_of(token))
            .unwrap_or_default()
    }

    pub fn debt_of(&self, user: &Address) -> Amount {
        self.get(user).map(Position::debt).unwrap_or_default()
    }

    /// Number of non-empty positions
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Position)> {
        self.positions.iter()
    }

    /// Install every staged position; emptied positions are dropped
    pub fn commit(&mut self, changes: Changeset) {
        for (user, position) in changes.staged {
            if position.is_empty() {
                self.positions.remove(&user);
            } else {
                self.positions.insert(user, position);
            }
        }
    }

    /// Apply a historical event to the book
    pub fn apply_event(&mut self, event: &LedgerEvent) -> Result<(), LedgerError> {
        let mut changes = Changeset::new();
        match event {
            LedgerEvent::CollateralDeposited {
                user,
                token,
                amount,
            } => changes.touch(self, user).credit_collateral(token, *amount)?,
            LedgerEvent::CollateralRedeemed {
                from,
                token,
                amount,
                ..
            } => changes
                .touch(self, from)
                .debit_collateral(from, token, *amount)?,
            LedgerEvent::DebtMinted { user, amount } => {
                changes.touch(self, user).add_debt(*amount)?
            }
            LedgerEvent::DebtBurned {
                on_behalf_of,
                amount,
                ..
            } => changes
                .touch(self, on_behalf_of)
                .sub_debt(on_behalf_of, *amount)?,
            LedgerEvent::PositionLiquidated { .. } => {}
        }
        self.commit(changes);
        Ok(())
    }
}

/// Positions staged by an in-flight operation
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    staged: HashMap<Address, Position>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable staged copy of `user`'s position, cloned from `book` on first touch
    pub fn touch(&mut self, book: &PositionBook, user: &Address) -> &mut Position {
        self.staged
            .entry(user.clone())
            .or_insert_with(|| book.position(user))
    }

    /// `user`'s position as it would be after commit
    pub fn view(&self, book: &PositionBook, user: &Address) -> Position {
        self.staged
            .get(user)
            .cloned()
            .unwrap_or_else(|| book.position(user))
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}
