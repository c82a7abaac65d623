//! In-memory token implementations
//!
//! Used by tests and the CLI simulation. Balances are plain maps behind a
//! lock; a failure switch on `SimpleToken` simulates a token that reports
//! `false` instead of moving funds.

use pegbank_core::{Address, Amount, TokenId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::token::{CollateralToken, DebtToken, MintAuthority};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Balances {
    accounts: HashMap<Address, Amount>,
    total_supply: Amount,
}

impl Balances {
    fn balance_of(&self, owner: &Address) -> Amount {
        self.accounts.get(owner).copied().unwrap_or_default()
    }

    fn mint(&mut self, to: &Address, amount: Amount) -> bool {
        let (Some(balance), Some(supply)) = (
            self.balance_of(to).checked_add(&amount),
            self.total_supply.checked_add(&amount),
        ) else {
            return false;
        };
        self.accounts.insert(to.clone(), balance);
        self.total_supply = supply;
        true
    }

    fn burn(&mut self, from: &Address, amount: Amount) -> bool {
        let (Some(balance), Some(supply)) = (
            self.balance_of(from).checked_sub(&amount),
            self.total_supply.checked_sub(&amount),
        ) else {
            return false;
        };
        self.accounts.insert(from.clone(), balance);
        self.total_supply = supply;
        true
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> bool {
        if from == to {
            return self.balance_of(from) >= amount;
        }
        let (Some(remaining), Some(credited)) = (
            self.balance_of(from).checked_sub(&amount),
            self.balance_of(to).checked_add(&amount),
        ) else {
            return false;
        };
        self.accounts.insert(from.clone(), remaining);
        self.accounts.insert(to.clone(), credited);
        true
    }
}

/// Plain transferable token used as collateral
#[derive(Debug)]
pub struct SimpleToken {
    id: TokenId,
    decimals: u8,
    balances: RwLock<Balances>,
    failing: AtomicBool,
}

impl SimpleToken {
    pub fn new(id: TokenId, decimals: u8) -> Self {
        Self {
            id,
            decimals,
            balances: RwLock::new(Balances::default()),
            failing: AtomicBool::new(false),
        }
    }

    /// Create new supply for `to` (faucet)
    pub fn mint_to(&self, to: &Address, amount: Amount) -> bool {
        self.balances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mint(to, amount)
    }

    /// Make every transfer report failure until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn total_supply(&self) -> Amount {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .total_supply
    }

    fn move_funds(&self, from: &Address, to: &Address, amount: Amount) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            return false;
        }
        self.balances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .transfer(from, to, amount)
    }
}

impl CollateralToken for SimpleToken {
    fn token_id(&self) -> &TokenId {
        &self.id
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .balance_of(owner)
    }

    fn transfer_from(&self, owner: &Address, recipient: &Address, amount: Amount) -> bool {
        self.move_funds(owner, recipient, amount)
    }

    fn transfer(&self, sender: &Address, recipient: &Address, amount: Amount) -> bool {
        self.move_funds(sender, recipient, amount)
    }
}

/// Synthetic debt token; only the holder of its `MintAuthority` can mint or burn
#[derive(Debug)]
pub struct StableToken {
    symbol: String,
    authority_id: Uuid,
    balances: RwLock<Balances>,
}

impl StableToken {
    /// Create the token and its one mint authority, held by `holder`
    pub fn issue(symbol: impl Into<String>, holder: Address) -> (Self, MintAuthority) {
        let authority = MintAuthority::new(holder);
        let token = Self {
            symbol: symbol.into(),
            authority_id: authority.id(),
            balances: RwLock::new(Balances::default()),
        };
        (token, authority)
    }
}

impl DebtToken for StableToken {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn accepts(&self, authority: &MintAuthority) -> bool {
        authority.id() == self.authority_id
    }

    fn mint(&self, authority: &MintAuthority, recipient: &Address, amount: Amount) -> bool {
        if !self.accepts(authority) || amount.is_zero() {
            return false;
        }
        self.balances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mint(recipient, amount)
    }

    fn burn(&self, authority: &MintAuthority, amount: Amount) -> bool {
        if !self.accepts(authority) || amount.is_zero() {
            return false;
        }
        self.balances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .burn(authority.holder(), amount)
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .balance_of(owner)
    }

    fn total_supply(&self) -> Amount {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .total_supply
    }

    fn transfer_from(&self, owner: &Address, recipient: &Address, amount: Amount) -> bool {
        self.balances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .transfer(owner, recipient, amount)
    }

    fn transfer(&self, sender: &Address, recipient: &Address, amount: Amount) -> bool {
        self.transfer_from(sender, recipient, amount)
    }
}
