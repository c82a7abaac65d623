//! Collateral engine implementation

use chrono::{DateTime, Utc};
use pegbank_core::constants::STALENESS_TIMEOUT_SECS;
use pegbank_core::{Address, Amount, HealthFactor, TokenId};
use pegbank_ledger::{
    CollateralToken, ConfigError, ConfigRegistry, DebtToken, Effect, LedgerError, LedgerEvent,
    MintAuthority, Position, PositionBook, Settlement,
};
use pegbank_oracle::{Clock, FreshPrice, OracleAdapter, PriceFeed, SystemClock};
use pegbank_risk::{
    calculate_health_factor, HealthFactorEngine, LiquidationEngine, RiskError, RiskParameters,
};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::error::EngineError;
use crate::guard::ReentrancyGuard;
use crate::tx::Transaction;

/// Result of a committed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub operation: &'static str,
    /// Events in the order the changes were applied
    pub events: Vec<LedgerEvent>,
    pub committed_at: DateTime<Utc>,
}

/// Overcollateralized debt engine
///
/// Holds the committed positions, the collateral registry and the debt
/// token's mint authority. Mutating operations are serialized by a
/// reentrancy guard; queries read committed state only.
pub struct CollateralEngine {
    address: Address,
    health: HealthFactorEngine,
    liquidation: LiquidationEngine,
    debt_token: Arc<dyn DebtToken>,
    authority: MintAuthority,
    book: RwLock<PositionBook>,
    guard: ReentrancyGuard,
}

impl CollateralEngine {
    pub fn builder() -> CollateralEngineBuilder {
        CollateralEngineBuilder::new()
    }

    // === Mutating operations ===

    /// Lock `amount` of `token` from `user` as collateral
    pub fn deposit_collateral(
        &self,
        user: &Address,
        token: &TokenId,
        amount: Amount,
    ) -> Result<Receipt, EngineError> {
        self.run("deposit_collateral", user, |tx| {
            require_nonzero(amount)?;
            self.require_listed(token)?;
            tx.deposit_collateral(user, token, amount)?;
            Ok(())
        })
    }

    /// Return collateral to `user`; the position must stay healthy
    pub fn withdraw_collateral(
        &self,
        user: &Address,
        token: &TokenId,
        amount: Amount,
    ) -> Result<Receipt, EngineError> {
        self.run("withdraw_collateral", user, |tx| {
            require_nonzero(amount)?;
            self.require_listed(token)?;
            tx.redeem_collateral(user, user, token, amount)?;
            self.require_healthy(user, &tx.position(user))?;
            Ok(())
        })
    }

    /// Issue debt tokens to `user` against their collateral
    pub fn mint_debt(&self, user: &Address, amount: Amount) -> Result<Receipt, EngineError> {
        self.run("mint_debt", user, |tx| {
            require_nonzero(amount)?;
            tx.mint_debt(user, amount)?;
            self.require_healthy(user, &tx.position(user))?;
            Ok(())
        })
    }

    /// Repay `on_behalf_of`'s debt with tokens taken from `payer`
    pub fn burn_debt(
        &self,
        payer: &Address,
        on_behalf_of: &Address,
        amount: Amount,
    ) -> Result<Receipt, EngineError> {
        self.run("burn_debt", on_behalf_of, |tx| {
            require_nonzero(amount)?;
            tx.burn_debt(payer, on_behalf_of, amount)?;
            self.require_healthy(payer, &tx.position(payer))?;
            Ok(())
        })
    }

    pub fn deposit_and_mint(
        &self,
        user: &Address,
        token: &TokenId,
        collateral_amount: Amount,
        debt_amount: Amount,
    ) -> Result<Receipt, EngineError> {
        self.run("deposit_and_mint", user, |tx| {
            require_nonzero(collateral_amount)?;
            require_nonzero(debt_amount)?;
            self.require_listed(token)?;
            tx.deposit_collateral(user, token, collateral_amount)?;
            tx.mint_debt(user, debt_amount)?;
            self.require_healthy(user, &tx.position(user))?;
            Ok(())
        })
    }

    /// Repay debt and take collateral back in one step
    pub fn redeem_and_burn(
        &self,
        user: &Address,
        token: &TokenId,
        collateral_amount: Amount,
        debt_amount: Amount,
    ) -> Result<Receipt, EngineError> {
        self.run("redeem_and_burn", user, |tx| {
            require_nonzero(collateral_amount)?;
            require_nonzero(debt_amount)?;
            self.require_listed(token)?;
            tx.burn_debt(user, user, debt_amount)?;
            tx.redeem_collateral(user, user, token, collateral_amount)?;
            self.require_healthy(user, &tx.position(user))?;
            Ok(())
        })
    }

    /// Repay `debt_to_cover` of an unhealthy `target` and seize the
    /// equivalent collateral plus the liquidation bonus.
    pub fn liquidate(
        &self,
        liquidator: &Address,
        target: &Address,
        token: &TokenId,
        debt_to_cover: Amount,
    ) -> Result<Receipt, EngineError> {
        self.run("liquidate", target, |tx| {
            require_nonzero(debt_to_cover)?;
            self.require_listed(token)?;

            let health_before = self.health.health_factor(&tx.position(target))?;
            self.liquidation.ensure_liquidatable(target, health_before)?;

            let plan = self.liquidation.plan(&self.health, token, debt_to_cover)?;
            tracing::debug!(
                target = %target,
                token = %token,
                debt_to_cover = %debt_to_cover,
                seized = %plan.total_seized,
                "Planned liquidation"
            );

            tx.redeem_collateral(target, liquidator, token, plan.total_seized)?;
            tx.burn_debt(liquidator, target, debt_to_cover)?;

            let health_after = self.health.health_factor(&tx.position(target))?;
            self.liquidation
                .verify_improved(target, health_before, health_after)?;
            self.require_healthy(liquidator, &tx.position(liquidator))?;

            tx.record(LedgerEvent::PositionLiquidated {
                target: target.clone(),
                liquidator: liquidator.clone(),
                token: token.clone(),
                debt_covered: debt_to_cover,
                collateral_seized: plan.total_seized,
                bonus: plan.bonus,
                health_before,
                health_after,
            });
            Ok(())
        })
    }

    /// Rebuild committed positions from historical events, without checks
    /// or token movements. Replaces the current book.
    pub fn replay<'e>(
        &self,
        events: impl IntoIterator<Item = &'e LedgerEvent>,
    ) -> Result<usize, EngineError> {
        let _entered = self.guard.enter()?;

        let mut book = PositionBook::new();
        let mut applied = 0;
        for event in events {
            book.apply_event(event)?;
            applied += 1;
        }

        let positions = book.len();
        *self.book.write().unwrap_or_else(PoisonError::into_inner) = book;
        tracing::info!(events = applied, positions, "Replayed ledger events");
        Ok(applied)
    }

    // === Queries ===

    /// Custody address holding deposited collateral
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn debt_token(&self) -> &Arc<dyn DebtToken> {
        &self.debt_token
    }

    pub fn collateral_tokens(&self) -> Vec<TokenId> {
        self.health.registry().collateral_tokens()
    }

    pub fn price_feed_of(&self, token: &TokenId) -> Option<Arc<dyn PriceFeed>> {
        self.health.registry().price_feed_of(token)
    }

    pub fn registry(&self) -> &ConfigRegistry {
        self.health.registry()
    }

    pub fn risk_parameters(&self) -> &RiskParameters {
        self.health.params()
    }

    pub fn staleness_timeout(&self) -> u64 {
        self.health.oracle().timeout_secs()
    }

    /// Committed position of `user` (empty if they never interacted)
    pub fn position_of(&self, user: &Address) -> Position {
        self.committed().position(user)
    }

    /// All non-empty committed positions
    pub fn positions(&self) -> Vec<(Address, Position)> {
        let mut positions: Vec<_> = self
            .committed()
            .iter()
            .map(|(user, position)| (user.clone(), position.clone()))
            .collect();
        positions.sort_by(|a, b| a.0.cmp(&b.0));
        positions
    }

    pub fn collateral_balance_of(&self, user: &Address, token: &TokenId) -> Amount {
        self.committed().collateral_balance_of(user, token)
    }

    pub fn debt_of(&self, user: &Address) -> Amount {
        self.committed().debt_of(user)
    }

    pub fn account_collateral_value(&self, user: &Address) -> Result<Amount, EngineError> {
        let position = self.position_of(user);
        Ok(self.health.account_collateral_value(&position)?)
    }

    /// `(total debt, collateral value in USD)`
    pub fn account_information(&self, user: &Address) -> Result<(Amount, Amount), EngineError> {
        let position = self.position_of(user);
        let value = self.health.account_collateral_value(&position)?;
        Ok((position.debt(), value))
    }

    pub fn health_factor_of(&self, user: &Address) -> Result<HealthFactor, EngineError> {
        let position = self.position_of(user);
        Ok(self.health.health_factor(&position)?)
    }

    pub fn usd_value(&self, token: &TokenId, amount: Amount) -> Result<Amount, EngineError> {
        Ok(self.health.usd_value(token, amount)?)
    }

    pub fn token_amount_from_usd(
        &self,
        token: &TokenId,
        usd: Amount,
    ) -> Result<Amount, EngineError> {
        Ok(self.health.token_amount_from_usd(token, usd)?)
    }

    pub fn get_fresh_price(&self, token: &TokenId) -> Result<FreshPrice, EngineError> {
        Ok(self.health.price_of(token)?)
    }

    /// Stateless health factor under this engine's risk parameters
    pub fn calculate_health_factor(
        &self,
        total_debt: Amount,
        collateral_value_usd: Amount,
    ) -> Result<HealthFactor, EngineError> {
        Ok(calculate_health_factor(
            total_debt,
            collateral_value_usd,
            self.health.params(),
        )?)
    }

    // === Internals ===

    fn committed(&self) -> RwLockReadGuard<'_, PositionBook> {
        self.book.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stage, check, settle, commit. Nothing is committed unless `stage`
    /// and the settlement both succeed.
    fn run<F>(&self, operation: &'static str, user: &Address, stage: F) -> Result<Receipt, EngineError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<(), EngineError>,
    {
        let _entered = self.guard.enter().inspect_err(|_| {
            tracing::warn!(operation, user = %user, "Rejected reentrant call");
        })?;

        let mut tx = Transaction::new(&self.book);
        let outcome = stage(&mut tx).and_then(|()| {
            let effects = std::mem::take(&mut tx.effects);
            tracing::debug!(operation, user = %user, effects = effects.len(), "Staged");
            self.settle(effects)
        });

        if let Err(err) = outcome {
            tracing::warn!(operation, user = %user, error = %err, "Operation rejected");
            return Err(err);
        }

        self.book
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .commit(tx.changes);

        let receipt = Receipt {
            operation,
            events: tx.events,
            committed_at: self.health.oracle().now(),
        };
        tracing::info!(
            operation,
            user = %user,
            events = receipt.events.len(),
            "Operation committed"
        );
        Ok(receipt)
    }

    fn settle(&self, effects: Vec<Effect>) -> Result<(), EngineError> {
        Settlement::new(
            &self.address,
            self.health.registry(),
            self.debt_token.as_ref(),
            &self.authority,
        )
        .execute(effects)?;
        Ok(())
    }

    fn require_listed(&self, token: &TokenId) -> Result<(), LedgerError> {
        if self.health.registry().is_listed(token) {
            Ok(())
        } else {
            Err(LedgerError::TokenNotAllowed(token.clone()))
        }
    }

    fn require_healthy(&self, user: &Address, position: &Position) -> Result<(), EngineError> {
        let health_factor = self.health.health_factor(position)?;
        if !self.health.is_healthy(health_factor) {
            return Err(RiskError::HealthFactorBelowThreshold {
                user: user.clone(),
                health_factor,
            }
            .into());
        }
        Ok(())
    }
}

fn require_nonzero(amount: Amount) -> Result<(), LedgerError> {
    if amount.is_zero() {
        Err(LedgerError::ZeroAmount)
    } else {
        Ok(())
    }
}

impl fmt::Debug for CollateralEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollateralEngine")
            .field("address", &self.address)
            .field("collateral", &self.collateral_tokens())
            .field("debt_token", &self.debt_token.symbol())
            .field("positions", &self.committed().len())
            .finish_non_exhaustive()
    }
}

/// Builder for `CollateralEngine`
pub struct CollateralEngineBuilder {
    address: Option<Address>,
    tokens: Vec<Arc<dyn CollateralToken>>,
    feeds: Vec<Arc<dyn PriceFeed>>,
    debt: Option<(Arc<dyn DebtToken>, MintAuthority)>,
    clock: Option<Arc<dyn Clock>>,
    params: RiskParameters,
    staleness_timeout_secs: u64,
}

impl CollateralEngineBuilder {
    pub fn new() -> Self {
        Self {
            address: None,
            tokens: Vec::new(),
            feeds: Vec::new(),
            debt: None,
            clock: None,
            params: RiskParameters::default(),
            staleness_timeout_secs: STALENESS_TIMEOUT_SECS,
        }
    }

    /// Custody address; must be the mint authority's holder
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// List one collateral token with its price feed
    pub fn collateral(mut self, token: Arc<dyn CollateralToken>, feed: Arc<dyn PriceFeed>) -> Self {
        self.tokens.push(token);
        self.feeds.push(feed);
        self
    }

    /// List tokens and feeds as parallel lists, paired by position
    pub fn collateral_lists(
        mut self,
        tokens: Vec<Arc<dyn CollateralToken>>,
        feeds: Vec<Arc<dyn PriceFeed>>,
    ) -> Self {
        self.tokens.extend(tokens);
        self.feeds.extend(feeds);
        self
    }

    /// The debt token and its mint authority, handed over for good
    pub fn debt_token(mut self, token: Arc<dyn DebtToken>, authority: MintAuthority) -> Self {
        self.debt = Some((token, authority));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn risk_parameters(mut self, params: RiskParameters) -> Self {
        self.params = params;
        self
    }

    pub fn staleness_timeout(mut self, secs: u64) -> Self {
        self.staleness_timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<CollateralEngine, EngineError> {
        let address = self.address.ok_or(ConfigError::Missing("engine address"))?;
        let (debt_token, authority) = self.debt.ok_or(ConfigError::Missing("debt token"))?;

        if authority.holder() != &address {
            return Err(ConfigError::AuthorityMismatch {
                holder: authority.holder().clone(),
                engine: address,
            }
            .into());
        }
        if !debt_token.accepts(&authority) {
            return Err(ConfigError::AuthorityRejected(debt_token.symbol().to_string()).into());
        }

        self.params.validate()?;
        let registry = Arc::new(ConfigRegistry::new(self.tokens, self.feeds)?);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let oracle = OracleAdapter::with_timeout(clock, self.staleness_timeout_secs);

        tracing::info!(
            address = %address,
            collateral = registry.len(),
            debt_token = debt_token.symbol(),
            staleness_timeout_secs = self.staleness_timeout_secs,
            "Collateral engine ready"
        );

        Ok(CollateralEngine {
            address,
            liquidation: LiquidationEngine::new(&self.params),
            health: HealthFactorEngine::new(registry, oracle, self.params),
            debt_token,
            authority,
            book: RwLock::new(PositionBook::new()),
            guard: ReentrancyGuard::new(),
        })
    }
}

impl Default for CollateralEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
