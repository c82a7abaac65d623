//! In-flight operation state

use pegbank_core::{Address, Amount, TokenId};
use pegbank_ledger::{Changeset, Effect, LedgerError, LedgerEvent, Position, PositionBook};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Staged positions, planned token movements and the events they produce.
///
/// The committed book is only read-locked for the duration of each staging
/// call, never while prices are fetched or tokens are moved.
pub(crate) struct Transaction<'a> {
    book: &'a RwLock<PositionBook>,
    pub(crate) changes: Changeset,
    pub(crate) effects: Vec<Effect>,
    pub(crate) events: Vec<LedgerEvent>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(book: &'a RwLock<PositionBook>) -> Self {
        Self {
            book,
            changes: Changeset::new(),
            effects: Vec::new(),
            events: Vec::new(),
        }
    }

    fn committed(&self) -> RwLockReadGuard<'a, PositionBook> {
        let book: &'a RwLock<PositionBook> = self.book;
        book.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Staged view of `user`'s position
    pub(crate) fn position(&self, user: &Address) -> Position {
        self.changes.view(&self.committed(), user)
    }

    pub(crate) fn deposit_collateral(
        &mut self,
        user: &Address,
        token: &TokenId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let book = self.committed();
        self.changes
            .touch(&book, user)
            .credit_collateral(token, amount)?;
        drop(book);

        self.effects.push(Effect::PullCollateral {
            token: token.clone(),
            from: user.clone(),
            amount,
        });
        self.events.push(LedgerEvent::CollateralDeposited {
            user: user.clone(),
            token: token.clone(),
            amount,
        });
        Ok(())
    }

    pub(crate) fn redeem_collateral(
        &mut self,
        from: &Address,
        to: &Address,
        token: &TokenId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let book = self.committed();
        self.changes
            .touch(&book, from)
            .debit_collateral(from, token, amount)?;
        drop(book);

        self.effects.push(Effect::PushCollateral {
            token: token.clone(),
            to: to.clone(),
            amount,
        });
        self.events.push(LedgerEvent::CollateralRedeemed {
            from: from.clone(),
            to: to.clone(),
            token: token.clone(),
            amount,
        });
        Ok(())
    }

    pub(crate) fn mint_debt(&mut self, user: &Address, amount: Amount) -> Result<(), LedgerError> {
        let book = self.committed();
        self.changes.touch(&book, user).add_debt(amount)?;
        drop(book);

        self.effects.push(Effect::MintDebt {
            to: user.clone(),
            amount,
        });
        self.events.push(LedgerEvent::DebtMinted {
            user: user.clone(),
            amount,
        });
        Ok(())
    }

    pub(crate) fn burn_debt(
        &mut self,
        payer: &Address,
        on_behalf_of: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let book = self.committed();
        self.changes
            .touch(&book, on_behalf_of)
            .sub_debt(on_behalf_of, amount)?;
        drop(book);

        self.effects.push(Effect::PullDebt {
            payer: payer.clone(),
            amount,
        });
        self.effects.push(Effect::BurnDebt { amount });
        self.events.push(LedgerEvent::DebtBurned {
            on_behalf_of: on_behalf_of.clone(),
            payer: payer.clone(),
            amount,
        });
        Ok(())
    }

    pub(crate) fn record(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}
