//! External asset capabilities
//!
//! The engine never owns token balances; it asks these capabilities to move
//! them and treats a `false` return as a failed transfer. The engine always
//! passes its own custody address as `sender` where the underlying token
//! would use the implicit caller.

use pegbank_core::constants::DEFAULT_TOKEN_DECIMALS;
use pegbank_core::{Address, Amount, TokenId};
use uuid::Uuid;

/// A transferable collateral asset
pub trait CollateralToken: Send + Sync {
    fn token_id(&self) -> &TokenId;

    /// Decimal places of the token's smallest unit
    fn decimals(&self) -> u8 {
        DEFAULT_TOKEN_DECIMALS
    }

    fn balance_of(&self, owner: &Address) -> Amount;

    /// Move `amount` from `owner` to `recipient`
    fn transfer_from(&self, owner: &Address, recipient: &Address, amount: Amount) -> bool;

    /// Move `amount` out of `sender`'s own balance
    fn transfer(&self, sender: &Address, recipient: &Address, amount: Amount) -> bool;
}

/// Write-once right to mint and burn the debt token.
///
/// Created together with the debt token and moved into the engine at
/// construction. It cannot be cloned, so there is exactly one holder for the
/// lifetime of the token.
#[derive(Debug)]
pub struct MintAuthority {
    id: Uuid,
    holder: Address,
}

impl MintAuthority {
    pub fn new(holder: Address) -> Self {
        Self {
            id: Uuid::new_v4(),
            holder,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Address whose balance `burn` draws from
    pub fn holder(&self) -> &Address {
        &self.holder
    }
}

/// The mintable/burnable synthetic debt token
pub trait DebtToken: Send + Sync {
    fn symbol(&self) -> &str;

    /// Whether `authority` is the one this token was issued with
    fn accepts(&self, authority: &MintAuthority) -> bool;

    fn mint(&self, authority: &MintAuthority, recipient: &Address, amount: Amount) -> bool;

    /// Burn from the authority holder's own balance
    fn burn(&self, authority: &MintAuthority, amount: Amount) -> bool;

    fn balance_of(&self, owner: &Address) -> Amount;

    fn total_supply(&self) -> Amount;

    fn transfer_from(&self, owner: &Address, recipient: &Address, amount: Amount) -> bool;

    fn transfer(&self, sender: &Address, recipient: &Address, amount: Amount) -> bool;
}
