//! Settlement - External token movements for a committed operation
//!
//! Effects run after every internal check has passed, in a fixed phase
//! order: pulls into custody, burns, mints, then payouts. If one fails, the
//! effects that already ran are undone in reverse order and the operation's
//! staged state is discarded by the caller.

use pegbank_core::{Address, Amount, TokenId};
use std::fmt;

use crate::error::LedgerError;
use crate::registry::ConfigRegistry;
use crate::token::{DebtToken, MintAuthority};

/// One external token movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Collateral from a user into custody
    PullCollateral {
        token: TokenId,
        from: Address,
        amount: Amount,
    },
    /// Collateral from custody to a user
    PushCollateral {
        token: TokenId,
        to: Address,
        amount: Amount,
    },
    /// Debt tokens from a payer into custody, ahead of a burn
    PullDebt { payer: Address, amount: Amount },
    /// Destroy debt tokens held in custody
    BurnDebt { amount: Amount },
    /// New debt tokens to a user
    MintDebt { to: Address, amount: Amount },
}

impl Effect {
    /// Execution phase; lower runs first
    pub fn phase(&self) -> u8 {
        match self {
            Effect::PullCollateral { .. } | Effect::PullDebt { .. } => 0,
            Effect::BurnDebt { .. } => 1,
            Effect::MintDebt { .. } => 2,
            Effect::PushCollateral { .. } => 3,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::PullCollateral {
                token,
                from,
                amount,
            } => write!(f, "pull {} {} from {}", amount, token, from),
            Effect::PushCollateral { token, to, amount } => {
                write!(f, "push {} {} to {}", amount, token, to)
            }
            Effect::PullDebt { payer, amount } => write!(f, "pull {} debt from {}", amount, payer),
            Effect::BurnDebt { amount } => write!(f, "burn {} debt", amount),
            Effect::MintDebt { to, amount } => write!(f, "mint {} debt to {}", amount, to),
        }
    }
}

/// Executes effects against the external tokens on behalf of `custody`
pub struct Settlement<'a> {
    custody: &'a Address,
    registry: &'a ConfigRegistry,
    debt_token: &'a dyn DebtToken,
    authority: &'a MintAuthority,
}

impl<'a> Settlement<'a> {
    pub fn new(
        custody: &'a Address,
        registry: &'a ConfigRegistry,
        debt_token: &'a dyn DebtToken,
        authority: &'a MintAuthority,
    ) -> Self {
        Self {
            custody,
            registry,
            debt_token,
            authority,
        }
    }

    /// Run all effects in phase order, or none of them.
    ///
    /// Returns the first failure. If undoing an earlier effect also fails the
    /// error is `CompensationFailed` and external balances may be out of step.
    pub fn execute(&self, mut effects: Vec<Effect>) -> Result<(), LedgerError> {
        effects.sort_by_key(Effect::phase);

        for (done, effect) in effects.iter().enumerate() {
            tracing::debug!(effect = %effect, "Settling");
            if let Err(err) = self.apply(effect) {
                tracing::warn!(effect = %effect, error = %err, "Settlement failed, compensating");
                return Err(self.compensate(&effects[..done], err));
            }
        }
        Ok(())
    }

    fn apply(&self, effect: &Effect) -> Result<(), LedgerError> {
        let ok = match effect {
            Effect::PullCollateral {
                token,
                from,
                amount,
            } => self
                .registry
                .asset(token)?
                .token
                .transfer_from(from, self.custody, *amount),
            Effect::PushCollateral { token, to, amount } => self
                .registry
                .asset(token)?
                .token
                .transfer(self.custody, to, *amount),
            Effect::PullDebt { payer, amount } => {
                self.debt_token.transfer_from(payer, self.custody, *amount)
            }
            Effect::BurnDebt { amount } => self.debt_token.burn(self.authority, *amount),
            Effect::MintDebt { to, amount } => self.debt_token.mint(self.authority, to, *amount),
        };

        if ok {
            Ok(())
        } else {
            Err(failure(effect, self.custody))
        }
    }

    fn undo(&self, effect: &Effect) -> bool {
        match effect {
            Effect::PullCollateral {
                token,
                from,
                amount,
            } => self
                .registry
                .asset(token)
                .map(|a| a.token.transfer(self.custody, from, *amount))
                .unwrap_or(false),
            Effect::PushCollateral { token, to, amount } => self
                .registry
                .asset(token)
                .map(|a| a.token.transfer_from(to, self.custody, *amount))
                .unwrap_or(false),
            Effect::PullDebt { payer, amount } => {
                self.debt_token.transfer(self.custody, payer, *amount)
            }
            Effect::BurnDebt { amount } => {
                self.debt_token
                    .mint(self.authority, self.custody, *amount)
            }
            Effect::MintDebt { to, amount } => {
                self.debt_token.transfer_from(to, self.custody, *amount)
                    && self.debt_token.burn(self.authority, *amount)
            }
        }
    }

    fn compensate(&self, applied: &[Effect], cause: LedgerError) -> LedgerError {
        let mut stuck = None;
        for effect in applied.iter().rev() {
            if !self.undo(effect) {
                tracing::error!(effect = %effect, cause = %cause, "Compensation failed");
                stuck.get_or_insert_with(|| effect.to_string());
            }
        }

        match stuck {
            Some(effect) => LedgerError::CompensationFailed {
                effect,
                cause: Box::new(cause),
            },
            None => cause,
        }
    }
}

fn failure(effect: &Effect, custody: &Address) -> LedgerError {
    match effect {
        Effect::PullCollateral {
            token,
            from,
            amount,
        } => LedgerError::TransferFailed {
            token: token.clone(),
            from: from.clone(),
            to: custody.clone(),
            amount: *amount,
        },
        Effect::PushCollateral { token, to, amount } => LedgerError::TransferFailed {
            token: token.clone(),
            from: custody.clone(),
            to: to.clone(),
            amount: *amount,
        },
        Effect::PullDebt { payer, amount } => LedgerError::BurnTransferFailed {
            payer: payer.clone(),
            amount: *amount,
        },
        Effect::BurnDebt { amount } => LedgerError::BurnFailed { amount: *amount },
        Effect::MintDebt { to, amount } => LedgerError::MintFailed {
            recipient: to.clone(),
            amount: *amount,
        },
    }
}
