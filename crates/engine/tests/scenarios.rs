//! End-to-end scenarios for the collateral engine
//!
//! Each test builds an isolated world: in-memory WETH/WBTC tokens, settable
//! price feeds on a manual clock, and a debt token whose mint can be broken
//! on demand.

use chrono::Duration;
use pegbank_core::{Address, Amount, HealthFactor, TokenId};
use pegbank_engine::{CollateralEngine, EngineError};
use pegbank_ledger::{
    CollateralToken, DebtToken, LedgerError, LedgerEvent, MintAuthority, SimpleToken, StableToken,
};
use pegbank_oracle::{Clock, ManualClock, MockFeed, OracleError, PriceFeed};
use pegbank_risk::RiskError;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// Stable token whose mint can be made to fail
struct SwitchableStable {
    inner: StableToken,
    fail_mint: AtomicBool,
}

impl DebtToken for SwitchableStable {
    fn symbol(&self) -> &str {
        self.inner.symbol()
    }

    fn accepts(&self, authority: &MintAuthority) -> bool {
        self.inner.accepts(authority)
    }

    fn mint(&self, authority: &MintAuthority, recipient: &Address, amount: Amount) -> bool {
        !self.fail_mint.load(Ordering::SeqCst) && self.inner.mint(authority, recipient, amount)
    }

    fn burn(&self, authority: &MintAuthority, amount: Amount) -> bool {
        self.inner.burn(authority, amount)
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.inner.balance_of(owner)
    }

    fn total_supply(&self) -> Amount {
        self.inner.total_supply()
    }

    fn transfer_from(&self, owner: &Address, recipient: &Address, amount: Amount) -> bool {
        self.inner.transfer_from(owner, recipient, amount)
    }

    fn transfer(&self, sender: &Address, recipient: &Address, amount: Amount) -> bool {
        self.inner.transfer(sender, recipient, amount)
    }
}

struct World {
    clock: Arc<ManualClock>,
    weth: Arc<SimpleToken>,
    wbtc: Arc<SimpleToken>,
    eth_feed: Arc<MockFeed>,
    stable: Arc<SwitchableStable>,
    engine: CollateralEngine,
}

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

fn alice() -> Address {
    addr("alice")
}

fn liquidator() -> Address {
    addr("liquidator")
}

fn weth_id() -> TokenId {
    TokenId::new("WETH").unwrap()
}

fn wbtc_id() -> TokenId {
    TokenId::new("WBTC").unwrap()
}

fn btc(units: u64) -> Amount {
    Amount::from(units * 100_000_000)
}

/// World listing `weth` as the WETH collateral
fn world_with_weth(eth_price: i128, weth: Arc<dyn CollateralToken>) -> World {
    let clock = Arc::new(ManualClock::default());
    let now = clock.now();
    let eth_feed = Arc::new(MockFeed::new("ETH / USD", 8, eth_price * 100_000_000, now));
    let btc_feed = Arc::new(MockFeed::new("BTC / USD", 8, 30_000_00000000, now));
    let wbtc = Arc::new(SimpleToken::new(wbtc_id(), 8));

    let (inner, authority) = StableToken::issue("pUSD", addr("engine"));
    let stable = Arc::new(SwitchableStable {
        inner,
        fail_mint: AtomicBool::new(false),
    });

    let engine = CollateralEngine::builder()
        .address(addr("engine"))
        .collateral(weth.clone(), eth_feed.clone() as Arc<dyn PriceFeed>)
        .collateral(wbtc.clone(), btc_feed as Arc<dyn PriceFeed>)
        .debt_token(stable.clone(), authority)
        .clock(clock.clone())
        .build()
        .unwrap();

    World {
        clock,
        weth: Arc::new(SimpleToken::new(weth_id(), 18)),
        wbtc,
        eth_feed,
        stable,
        engine,
    }
}

/// World with ETH at `eth_price` dollars; alice and the liquidator are funded
fn world(eth_price: i128) -> World {
    let weth = Arc::new(SimpleToken::new(weth_id(), 18));
    let mut world = world_with_weth(eth_price, weth.clone());
    world.weth = weth;

    world.weth.mint_to(&alice(), Amount::wad(10));
    world.weth.mint_to(&liquidator(), Amount::wad(10));
    world.wbtc.mint_to(&liquidator(), btc(1));
    world
}

fn assert_untouched(w: &World, user: &Address) {
    assert_eq!(w.engine.collateral_balance_of(user, &weth_id()), Amount::ZERO);
    assert_eq!(w.engine.debt_of(user), Amount::ZERO);
    assert!(w.engine.position_of(user).is_empty());
}

#[test]
fn test_deposit_then_withdraw_round_trip() {
    let w = world(2_000);

    let receipt = w
        .engine
        .deposit_collateral(&alice(), &weth_id(), Amount::wad(4))
        .unwrap();
    assert_eq!(receipt.operation, "deposit_collateral");
    assert_eq!(
        receipt.events,
        vec![LedgerEvent::CollateralDeposited {
            user: alice(),
            token: weth_id(),
            amount: Amount::wad(4),
        }]
    );
    assert_eq!(w.engine.collateral_balance_of(&alice(), &weth_id()), Amount::wad(4));
    assert_eq!(w.weth.balance_of(&addr("engine")), Amount::wad(4));

    let receipt = w
        .engine
        .withdraw_collateral(&alice(), &weth_id(), Amount::wad(4))
        .unwrap();
    assert!(matches!(
        &receipt.events[0],
        LedgerEvent::CollateralRedeemed { from, to, .. } if from == to
    ));

    assert_untouched(&w, &alice());
    assert_eq!(w.weth.balance_of(&alice()), Amount::wad(10));
    assert_eq!(w.weth.balance_of(&addr("engine")), Amount::ZERO);
}

#[test]
fn test_deposit_and_mint_up_to_threshold() {
    let w = world(2_000);

    // $20,000 of collateral backs at most $10,000 of debt
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(10_000))
        .unwrap();
    assert_eq!(w.engine.health_factor_of(&alice()).unwrap(), HealthFactor::ONE);
    assert_eq!(w.stable.balance_of(&alice()), Amount::wad(10_000));

    let (debt, value) = w.engine.account_information(&alice()).unwrap();
    assert_eq!(debt, Amount::wad(10_000));
    assert_eq!(value, Amount::wad(20_000));

    let result = w.engine.mint_debt(&alice(), Amount::wad(1));
    assert!(matches!(
        result,
        Err(EngineError::Risk(RiskError::HealthFactorBelowThreshold { .. }))
    ));
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(10_000));
    assert_eq!(w.stable.total_supply(), Amount::wad(10_000));
}

#[test]
fn test_unhealthy_withdraw_rejected() {
    let w = world(2_000);
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(5_000))
        .unwrap();

    // Leaving 4 WETH ($8,000) would put the health factor at 0.8
    let result = w
        .engine
        .withdraw_collateral(&alice(), &weth_id(), Amount::wad(6));
    match result {
        Err(EngineError::Risk(RiskError::HealthFactorBelowThreshold { user, health_factor })) => {
            assert_eq!(user, alice());
            assert_eq!(health_factor.to_decimal(), Some(dec!(0.8)));
        }
        other => panic!("expected HealthFactorBelowThreshold, got {:?}", other),
    }

    assert_eq!(w.engine.collateral_balance_of(&alice(), &weth_id()), Amount::wad(10));
    assert_eq!(w.weth.balance_of(&alice()), Amount::ZERO);

    // Half of it is fine
    w.engine
        .withdraw_collateral(&alice(), &weth_id(), Amount::wad(5))
        .unwrap();
    assert_eq!(w.engine.health_factor_of(&alice()).unwrap(), HealthFactor::ONE);
}

#[test]
fn test_validation_errors() {
    let w = world(2_000);
    let doge = TokenId::new("DOGE").unwrap();

    assert!(matches!(
        w.engine.deposit_collateral(&alice(), &weth_id(), Amount::ZERO),
        Err(EngineError::Ledger(LedgerError::ZeroAmount))
    ));
    assert!(matches!(
        w.engine.deposit_collateral(&alice(), &doge, Amount::wad(1)),
        Err(EngineError::Ledger(LedgerError::TokenNotAllowed(_)))
    ));
    assert!(matches!(
        w.engine.mint_debt(&alice(), Amount::ZERO),
        Err(EngineError::Ledger(LedgerError::ZeroAmount))
    ));
    assert!(matches!(
        w.engine.withdraw_collateral(&alice(), &weth_id(), Amount::wad(1)),
        Err(EngineError::Ledger(LedgerError::InsufficientCollateral { .. }))
    ));
    assert!(matches!(
        w.engine.burn_debt(&alice(), &alice(), Amount::wad(1)),
        Err(EngineError::Ledger(LedgerError::InsufficientDebt { .. }))
    ));
    assert_untouched(&w, &alice());
}

#[test]
fn test_stale_price_blocks_valuation() {
    let w = world(2_000);
    w.engine
        .deposit_collateral(&alice(), &weth_id(), Amount::wad(5))
        .unwrap();

    w.clock.advance(Duration::hours(3) + Duration::seconds(1));

    let result = w.engine.mint_debt(&alice(), Amount::wad(100));
    assert!(matches!(
        result,
        Err(EngineError::Oracle(OracleError::StalePrice { .. }))
    ));
    assert!(matches!(
        w.engine.withdraw_collateral(&alice(), &weth_id(), Amount::wad(1)),
        Err(EngineError::Oracle(OracleError::StalePrice { .. }))
    ));
    assert_eq!(w.engine.debt_of(&alice()), Amount::ZERO);
    assert_eq!(w.engine.collateral_balance_of(&alice(), &weth_id()), Amount::wad(5));
    assert_eq!(w.stable.total_supply(), Amount::ZERO);

    // Deposits need no price
    w.engine
        .deposit_collateral(&alice(), &weth_id(), Amount::wad(1))
        .unwrap();

    // Users without collateral still value to zero
    assert_eq!(
        w.engine.account_collateral_value(&addr("nobody")).unwrap(),
        Amount::ZERO
    );

    // A fresh round restores service
    w.eth_feed.set_updated_at(w.clock.now());
    w.engine.mint_debt(&alice(), Amount::wad(100)).unwrap();
}

/// Everything observable about the underwater world's holdings
fn holdings(w: &World) -> Vec<Amount> {
    vec![
        w.stable.total_supply(),
        w.stable.balance_of(&alice()),
        w.stable.balance_of(&liquidator()),
        w.weth.balance_of(&addr("engine")),
        w.weth.balance_of(&liquidator()),
        w.wbtc.balance_of(&addr("engine")),
    ]
}

fn stale<T>(result: Result<T, EngineError>) -> bool {
    matches!(result, Err(EngineError::Oracle(OracleError::StalePrice { .. })))
}

#[test]
fn test_stale_price_blocks_every_priced_operation() {
    let w = underwater_world();
    let positions = w.engine.positions();
    let before = holdings(&w);

    w.clock.advance(Duration::hours(3) + Duration::seconds(1));

    assert!(stale(w.engine.liquidate(
        &liquidator(),
        &alice(),
        &weth_id(),
        Amount::wad(10)
    )));
    // The payer carries debt of its own, so its post-check needs a price
    assert!(stale(w.engine.burn_debt(&liquidator(), &alice(), Amount::wad(10))));
    assert!(stale(w.engine.redeem_and_burn(
        &alice(),
        &weth_id(),
        Amount::wad(1),
        Amount::wad(10)
    )));
    assert!(stale(w.engine.deposit_and_mint(
        &liquidator(),
        &weth_id(),
        Amount::wad(1),
        Amount::wad(1)
    )));
    assert!(stale(w.engine.health_factor_of(&alice())));
    assert!(stale(w.engine.usd_value(&weth_id(), Amount::wad(1))));
    assert!(stale(w.engine.token_amount_from_usd(&weth_id(), Amount::wad(15))));

    assert_eq!(w.engine.positions(), positions);
    assert_eq!(holdings(&w), before);
}

#[test]
fn test_price_exactly_at_timeout_is_fresh() {
    let w = world(2_000);
    w.engine
        .deposit_collateral(&alice(), &weth_id(), Amount::wad(1))
        .unwrap();
    w.clock.advance(Duration::hours(3));
    assert!(w.engine.mint_debt(&alice(), Amount::wad(100)).is_ok());
}

#[test]
fn test_failed_transfer_leaves_no_trace() {
    let w = world(2_000);
    w.weth.set_failing(true);

    let result = w
        .engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(1), Amount::wad(100));
    assert!(matches!(
        result,
        Err(EngineError::Ledger(LedgerError::TransferFailed { .. }))
    ));
    assert_untouched(&w, &alice());
    assert_eq!(w.stable.total_supply(), Amount::ZERO);
}

#[test]
fn test_failed_withdraw_transfer_keeps_position() {
    let w = world(2_000);
    w.engine
        .deposit_collateral(&alice(), &weth_id(), Amount::wad(4))
        .unwrap();
    let position = w.engine.position_of(&alice());
    w.weth.set_failing(true);

    let result = w
        .engine
        .withdraw_collateral(&alice(), &weth_id(), Amount::wad(1));
    assert!(matches!(
        result,
        Err(EngineError::Ledger(LedgerError::TransferFailed { .. }))
    ));
    assert_eq!(w.engine.position_of(&alice()), position);
    assert_eq!(w.engine.collateral_balance_of(&alice(), &weth_id()), Amount::wad(4));
    assert_eq!(w.weth.balance_of(&alice()), Amount::wad(6));
    assert_eq!(w.weth.balance_of(&addr("engine")), Amount::wad(4));
}

#[test]
fn test_failed_mint_returns_collateral() {
    let w = world(2_000);
    w.stable.fail_mint.store(true, Ordering::SeqCst);

    let result = w
        .engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(1), Amount::wad(100));
    assert!(matches!(
        result,
        Err(EngineError::Ledger(LedgerError::MintFailed { .. }))
    ));
    assert_untouched(&w, &alice());
    assert_eq!(w.weth.balance_of(&alice()), Amount::wad(10));
    assert_eq!(w.weth.balance_of(&addr("engine")), Amount::ZERO);
}

#[test]
fn test_burn_debt_reduces_supply() {
    let w = world(2_000);
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(5_000))
        .unwrap();

    let receipt = w
        .engine
        .burn_debt(&alice(), &alice(), Amount::wad(2_000))
        .unwrap();
    assert_eq!(
        receipt.events,
        vec![LedgerEvent::DebtBurned {
            on_behalf_of: alice(),
            payer: alice(),
            amount: Amount::wad(2_000),
        }]
    );
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(3_000));
    assert_eq!(w.stable.total_supply(), Amount::wad(3_000));
    assert_eq!(w.stable.balance_of(&addr("engine")), Amount::ZERO);
}

#[test]
fn test_burn_without_tokens_fails() {
    let w = world(2_000);
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(5_000))
        .unwrap();
    assert!(w.stable.transfer(&alice(), &addr("bob"), Amount::wad(5_000)));

    let result = w.engine.burn_debt(&alice(), &alice(), Amount::wad(1_000));
    assert!(matches!(
        result,
        Err(EngineError::Ledger(LedgerError::BurnTransferFailed { .. }))
    ));
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(5_000));
}

#[test]
fn test_burn_on_behalf_of_another_user() {
    let w = world(2_000);
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(1_000))
        .unwrap();
    assert!(w.stable.transfer(&alice(), &addr("bob"), Amount::wad(400)));

    w.engine
        .burn_debt(&addr("bob"), &alice(), Amount::wad(400))
        .unwrap();
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(600));
    assert_eq!(w.stable.balance_of(&addr("bob")), Amount::ZERO);
}

#[test]
fn test_redeem_and_burn() {
    let w = world(2_000);
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(10_000))
        .unwrap();

    // Withdrawing alone would break the position; paying down first keeps it at 1.0
    let receipt = w
        .engine
        .redeem_and_burn(&alice(), &weth_id(), Amount::wad(5), Amount::wad(5_000))
        .unwrap();
    assert!(matches!(receipt.events[0], LedgerEvent::DebtBurned { .. }));
    assert!(matches!(receipt.events[1], LedgerEvent::CollateralRedeemed { .. }));

    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(5_000));
    assert_eq!(w.engine.collateral_balance_of(&alice(), &weth_id()), Amount::wad(5));
    assert_eq!(w.weth.balance_of(&alice()), Amount::wad(5));
    assert_eq!(w.engine.health_factor_of(&alice()).unwrap(), HealthFactor::ONE);
}

/// Alice: 10 WETH and 100 debt at $20, then ETH falls to $15 (health 0.75).
/// The liquidator holds 50 debt tokens minted against 1 WBTC.
fn underwater_world() -> World {
    let w = world(20);
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(100))
        .unwrap();
    w.engine
        .deposit_and_mint(&liquidator(), &wbtc_id(), btc(1), Amount::wad(50))
        .unwrap();

    w.eth_feed.set_answer(15_00000000, w.clock.now());
    assert_eq!(
        w.engine.health_factor_of(&alice()).unwrap().to_decimal(),
        Some(dec!(0.75))
    );
    w
}

#[test]
fn test_liquidation_scenario() {
    let w = underwater_world();
    let seized = Amount::from(3_666_666_666_666_666_666u128);

    let receipt = w
        .engine
        .liquidate(&liquidator(), &alice(), &weth_id(), Amount::wad(50))
        .unwrap();

    assert_eq!(receipt.events.len(), 3);
    assert_eq!(
        receipt.events[0],
        LedgerEvent::CollateralRedeemed {
            from: alice(),
            to: liquidator(),
            token: weth_id(),
            amount: seized,
        }
    );
    assert_eq!(
        receipt.events[1],
        LedgerEvent::DebtBurned {
            on_behalf_of: alice(),
            payer: liquidator(),
            amount: Amount::wad(50),
        }
    );
    match &receipt.events[2] {
        LedgerEvent::PositionLiquidated {
            bonus,
            health_before,
            health_after,
            ..
        } => {
            assert_eq!(*bonus, Amount::from(333_333_333_333_333_333u128));
            assert!(health_after > health_before);
        }
        other => panic!("expected PositionLiquidated, got {:?}", other),
    }

    let after = w.engine.health_factor_of(&alice()).unwrap();
    assert_eq!(after.to_decimal(), Some(dec!(0.95)));
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(50));
    assert_eq!(
        w.engine.collateral_balance_of(&alice(), &weth_id()),
        Amount::from(6_333_333_333_333_333_334u128)
    );
    assert_eq!(w.weth.balance_of(&liquidator()), Amount::wad(10).checked_add(&seized).unwrap());
    assert_eq!(w.stable.balance_of(&liquidator()), Amount::ZERO);
    assert_eq!(w.stable.total_supply(), Amount::wad(100));
}

#[test]
fn test_failed_liquidation_payout_restores_debt_tokens() {
    let w = underwater_world();
    let target = w.engine.position_of(&alice());
    let keeper = w.engine.position_of(&liquidator());
    w.weth.set_failing(true);

    // Debt tokens are pulled and burned before the collateral push fails
    let result = w
        .engine
        .liquidate(&liquidator(), &alice(), &weth_id(), Amount::wad(50));
    assert!(matches!(
        result,
        Err(EngineError::Ledger(LedgerError::TransferFailed { .. }))
    ));

    assert_eq!(w.stable.total_supply(), Amount::wad(150));
    assert_eq!(w.stable.balance_of(&liquidator()), Amount::wad(50));
    assert_eq!(w.stable.balance_of(&addr("engine")), Amount::ZERO);
    assert_eq!(w.weth.balance_of(&addr("engine")), Amount::wad(10));
    assert_eq!(w.weth.balance_of(&liquidator()), Amount::wad(10));

    assert_eq!(w.engine.position_of(&alice()), target);
    assert_eq!(w.engine.position_of(&liquidator()), keeper);
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(100));
    assert_eq!(w.engine.collateral_balance_of(&alice(), &weth_id()), Amount::wad(10));
}

#[test]
fn test_healthy_position_not_liquidatable() {
    let w = world(20);
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(100))
        .unwrap();
    w.engine
        .deposit_and_mint(&liquidator(), &wbtc_id(), btc(1), Amount::wad(50))
        .unwrap();

    let result = w
        .engine
        .liquidate(&liquidator(), &alice(), &weth_id(), Amount::wad(50));
    assert!(matches!(
        result,
        Err(EngineError::Risk(RiskError::NotLiquidatable { .. }))
    ));

    // A position without debt is never liquidatable
    let result = w
        .engine
        .liquidate(&alice(), &addr("nobody"), &weth_id(), Amount::wad(1));
    assert!(matches!(
        result,
        Err(EngineError::Risk(RiskError::NotLiquidatable { .. }))
    ));
}

#[test]
fn test_liquidation_cannot_seize_missing_collateral() {
    let w = underwater_world();
    w.eth_feed.set_answer(5_00000000, w.clock.now());

    // $100 at $5 is 20 WETH plus bonus, alice only has 10
    let result = w
        .engine
        .liquidate(&liquidator(), &alice(), &weth_id(), Amount::wad(100));
    assert!(matches!(
        result,
        Err(EngineError::Ledger(LedgerError::InsufficientCollateral { .. }))
    ));
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(100));
}

#[test]
fn test_liquidation_cannot_cover_more_than_debt() {
    let w = underwater_world();
    let result = w
        .engine
        .liquidate(&liquidator(), &alice(), &weth_id(), Amount::wad(101));
    assert!(matches!(
        result,
        Err(EngineError::Ledger(LedgerError::InsufficientDebt { .. }))
    ));
}

#[test]
fn test_liquidation_must_improve_health() {
    let w = underwater_world();
    // At $5 alice's health is 0.25; seizing 110% of a small repayment makes it worse
    w.eth_feed.set_answer(5_00000000, w.clock.now());

    let result = w
        .engine
        .liquidate(&liquidator(), &alice(), &weth_id(), Amount::wad(10));
    assert!(matches!(
        result,
        Err(EngineError::Risk(RiskError::HealthFactorNotImproved { .. }))
    ));
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(100));
    assert_eq!(w.stable.balance_of(&liquidator()), Amount::wad(50));
}

#[test]
fn test_unhealthy_liquidator_rejected() {
    let w = world(20);
    w.engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(100))
        .unwrap();
    w.engine
        .deposit_and_mint(&liquidator(), &weth_id(), Amount::wad(10), Amount::wad(100))
        .unwrap();
    w.eth_feed.set_answer(15_00000000, w.clock.now());

    let result = w
        .engine
        .liquidate(&liquidator(), &alice(), &weth_id(), Amount::wad(50));
    match result {
        Err(EngineError::Risk(RiskError::HealthFactorBelowThreshold { user, .. })) => {
            assert_eq!(user, liquidator())
        }
        other => panic!("expected liquidator health failure, got {:?}", other),
    }
    assert_eq!(w.engine.debt_of(&alice()), Amount::wad(100));
}

#[test]
fn test_committed_positions_stay_healthy() {
    let w = world(2_000);
    let _ = w
        .engine
        .deposit_and_mint(&alice(), &weth_id(), Amount::wad(3), Amount::wad(3_000));
    let _ = w.engine.mint_debt(&alice(), Amount::wad(5_000));
    let _ = w
        .engine
        .deposit_and_mint(&liquidator(), &wbtc_id(), btc(1), Amount::wad(15_000));
    let _ = w
        .engine
        .withdraw_collateral(&liquidator(), &wbtc_id(), Amount::from(10_000_000u64));
    let _ = w.engine.burn_debt(&alice(), &alice(), Amount::wad(500));
    let _ = w
        .engine
        .withdraw_collateral(&alice(), &weth_id(), Amount::wad(2));

    for (user, position) in w.engine.positions() {
        if !position.debt().is_zero() {
            let health = w.engine.health_factor_of(&user).unwrap();
            assert!(health >= HealthFactor::ONE, "{} at {}", user, health);
        }
    }
}

#[test]
fn test_valuation_is_additive() {
    let w = world(2_000);
    let a = Amount::from(1_234_567_890_123u64);
    let b = Amount::from(987_654_321_987_654_321u64);

    let separate = w
        .engine
        .usd_value(&weth_id(), a)
        .unwrap()
        .checked_add(&w.engine.usd_value(&weth_id(), b).unwrap())
        .unwrap();
    let combined = w
        .engine
        .usd_value(&weth_id(), a.checked_add(&b).unwrap())
        .unwrap();
    // Each term truncates independently, so the sum may trail by one unit
    let diff = combined.checked_sub(&separate).unwrap();
    assert!(diff <= Amount::from(1u64));

    let exact = w.engine.usd_value(&weth_id(), Amount::wad(2)).unwrap();
    assert_eq!(exact, Amount::wad(4_000));
    assert_eq!(
        w.engine
            .token_amount_from_usd(&weth_id(), Amount::wad(4_000))
            .unwrap(),
        Amount::wad(2)
    );
}

#[test]
fn test_getters_for_unknown_user() {
    let w = world(2_000);
    let nobody = addr("nobody");

    assert_eq!(w.engine.collateral_balance_of(&nobody, &weth_id()), Amount::ZERO);
    assert_eq!(w.engine.debt_of(&nobody), Amount::ZERO);
    assert_eq!(w.engine.account_collateral_value(&nobody).unwrap(), Amount::ZERO);
    assert_eq!(w.engine.health_factor_of(&nobody).unwrap(), HealthFactor::MAX);
    assert_eq!(
        w.engine.account_information(&nobody).unwrap(),
        (Amount::ZERO, Amount::ZERO)
    );
}

#[test]
fn test_stateless_health_factor() {
    let w = world(2_000);
    let hf = |debt, value| {
        w.engine
            .calculate_health_factor(Amount::wad(debt), Amount::wad(value))
            .unwrap()
    };
    assert_eq!(hf(0, 100), HealthFactor::MAX);
    assert_eq!(hf(50, 0), HealthFactor::ZERO);
    assert_eq!(hf(50, 100), HealthFactor::ONE);
    assert_eq!(hf(50, 200).to_decimal(), Some(dec!(2)));
    assert_eq!(hf(50, 50).to_decimal(), Some(dec!(0.5)));
}

#[test]
fn test_replay_rebuilds_positions() {
    let w = world(2_000);
    let mut events = Vec::new();
    events.extend(
        w.engine
            .deposit_and_mint(&alice(), &weth_id(), Amount::wad(10), Amount::wad(5_000))
            .unwrap()
            .events,
    );
    events.extend(
        w.engine
            .burn_debt(&alice(), &alice(), Amount::wad(1_000))
            .unwrap()
            .events,
    );
    let before = w.engine.positions();

    let fresh = world(2_000);
    assert_eq!(fresh.engine.replay(&events).unwrap(), 3);
    assert_eq!(fresh.engine.positions(), before);
    assert_eq!(fresh.engine.debt_of(&alice()), Amount::wad(4_000));
}

/// Calls back into the engine from inside a transfer
struct ReentrantToken {
    inner: SimpleToken,
    engine: OnceLock<Weak<CollateralEngine>>,
    observed: Mutex<Vec<String>>,
}

impl CollateralToken for ReentrantToken {
    fn token_id(&self) -> &TokenId {
        self.inner.token_id()
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.inner.balance_of(owner)
    }

    fn transfer_from(&self, owner: &Address, recipient: &Address, amount: Amount) -> bool {
        if let Some(engine) = self.engine.get().and_then(Weak::upgrade) {
            let nested = engine.deposit_collateral(owner, self.token_id(), amount);
            let visible = engine.collateral_balance_of(owner, self.token_id());
            let mut observed = self.observed.lock().unwrap();
            observed.push(format!("{:?}", nested.err()));
            observed.push(visible.to_string());
        }
        self.inner.transfer_from(owner, recipient, amount)
    }

    fn transfer(&self, sender: &Address, recipient: &Address, amount: Amount) -> bool {
        self.inner.transfer(sender, recipient, amount)
    }
}

#[test]
fn test_reentrant_call_rejected() {
    let token = Arc::new(ReentrantToken {
        inner: SimpleToken::new(weth_id(), 18),
        engine: OnceLock::new(),
        observed: Mutex::new(Vec::new()),
    });
    token.inner.mint_to(&alice(), Amount::wad(5));

    let w = world_with_weth(2_000, token.clone());
    let engine = Arc::new(w.engine);
    token.engine.set(Arc::downgrade(&engine)).ok();

    engine
        .deposit_collateral(&alice(), &weth_id(), Amount::wad(5))
        .unwrap();

    let observed = token.observed.lock().unwrap().clone();
    assert_eq!(observed, vec![format!("{:?}", Some(EngineError::Reentrant)), "0".to_string()]);
    assert_eq!(engine.collateral_balance_of(&alice(), &weth_id()), Amount::wad(5));

    // The guard is released afterwards
    engine
        .withdraw_collateral(&alice(), &weth_id(), Amount::wad(5))
        .unwrap();
}
