//! CLI commands
//!
//! Human-unit decimals are converted here: collateral amounts use the
//! token's decimals, debt amounts use 18, prices use the feed's decimals.

use pegbank_core::constants::USD_DECIMALS;
use pegbank_core::{Address, Amount, HealthFactor, TokenId};
use pegbank_events::{verify_chain, Command, JournalReader};
use pegbank_ledger::{CollateralToken, Position, PositionBook};
use rust_decimal::Decimal;

use crate::context::AppContext;

/// Render base units as a human decimal, falling back to the raw value
fn human(amount: Amount, decimals: u8) -> String {
    amount
        .to_decimal(decimals)
        .map(|d| d.to_string())
        .unwrap_or_else(|| format!("{} (base units)", amount))
}

fn human_hf(hf: HealthFactor) -> String {
    hf.to_decimal()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "∞".to_string())
}

fn collateral_amount(ctx: &AppContext, token: &TokenId, amount: Decimal) -> anyhow::Result<Amount> {
    let decimals = ctx.token_decimals(token)?;
    Ok(Amount::from_decimal(amount, decimals)?)
}

fn debt_amount(amount: Decimal) -> anyhow::Result<Amount> {
    Ok(Amount::from_decimal(amount, USD_DECIMALS)?)
}

/// Convert a USD price into a raw feed answer
fn feed_answer(ctx: &AppContext, token: &TokenId, price: Decimal) -> anyhow::Result<i128> {
    let Some(spec) = ctx.config.asset(token) else {
        anyhow::bail!("Unknown token: {}", token);
    };
    match spec.answer_for(price) {
        Some(answer) => Ok(answer),
        None => anyhow::bail!(
            "Price {} is not a valid {}-decimal feed answer",
            price,
            spec.feed_decimals
        ),
    }
}

/// Write the configuration and publish the initial prices
pub fn init(ctx: &mut AppContext, correlation_id: &str) -> anyhow::Result<()> {
    if ctx.is_initialized() {
        anyhow::bail!(
            "System already initialized (sequence = {})",
            ctx.last_sequence()
        );
    }

    ctx.save_config()?;

    let prices: Vec<(TokenId, Decimal)> = ctx
        .config
        .assets
        .iter()
        .map(|spec| (spec.symbol.clone(), spec.initial_price))
        .collect();
    for (token, price) in prices {
        let answer = feed_answer(ctx, &token, price)?;
        ctx.execute(Command::SetPrice { token, answer }, correlation_id)?;
    }

    println!(
        "✅ PegBank initialized: {} collateral assets, debt token {}",
        ctx.config.assets.len(),
        ctx.config.debt_symbol
    );
    Ok(())
}

/// List collateral assets with their current prices
pub fn assets(ctx: &AppContext) -> anyhow::Result<()> {
    let params = ctx.engine.risk_parameters();
    println!(
        "Collateral assets (threshold {}/{}, bonus {}%, staleness {}s):",
        params.liquidation_threshold,
        params.liquidation_precision,
        params.liquidation_bonus,
        ctx.engine.staleness_timeout()
    );

    for config in ctx.engine.registry().iter() {
        let price = match ctx.engine.get_fresh_price(&config.token_id) {
            Ok(fresh) => format!("${}", human(Amount::new(fresh.price), USD_DECIMALS)),
            Err(e) => format!("unavailable ({})", e),
        };
        let custody = config.token.balance_of(ctx.engine.address());
        println!(
            "  {:<6} decimals {:>2} | price {} | custody {}",
            config.token_id,
            config.decimals,
            price,
            human(custody, config.decimals)
        );
    }

    println!(
        "Debt token {}: supply {}",
        ctx.config.debt_symbol,
        human(ctx.debt_token_supply(), USD_DECIMALS)
    );
    Ok(())
}

/// Show a user's position and wallet
pub fn position(ctx: &AppContext, user: &str) -> anyhow::Result<()> {
    let user = Address::new(user)?;
    let position = ctx.engine.position_of(&user);

    println!("Position of {}:", user);
    for token in ctx.engine.collateral_tokens() {
        let decimals = ctx.token_decimals(&token)?;
        println!(
            "  {:<6} deposited {:>24} | wallet {:>24}",
            token,
            human(position.collateral_of(&token), decimals),
            human(ctx.wallet_balance(&user, &token)?, decimals)
        );
    }
    println!(
        "  Debt   {} {} | wallet {}",
        human(position.debt(), USD_DECIMALS),
        ctx.config.debt_symbol,
        human(ctx.debt_token_balance(&user), USD_DECIMALS)
    );

    match ctx.engine.account_information(&user) {
        Ok((_, value)) => {
            let hf = ctx.engine.calculate_health_factor(position.debt(), value)?;
            let status = if hf < ctx.engine.risk_parameters().min_health_factor {
                "❌ liquidatable"
            } else {
                "✅ healthy"
            };
            println!("  Collateral value ${}", human(value, USD_DECIMALS));
            println!("  Health factor {} {}", human_hf(hf), status);
        }
        Err(e) => println!("  Health factor unavailable: {}", e),
    }
    Ok(())
}

/// Mint simulated collateral tokens to a wallet
pub fn faucet(
    ctx: &mut AppContext,
    user: &str,
    amount: Decimal,
    token: &str,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let user = Address::new(user)?;
    let token = TokenId::new(token)?;
    let amount = collateral_amount(ctx, &token, amount)?;

    let record = ctx.execute(
        Command::Faucet {
            user: user.clone(),
            token: token.clone(),
            amount,
        },
        correlation_id,
    )?;

    println!(
        "✅ Faucet sent {} {} to {} (seq: {})",
        human(amount, ctx.token_decimals(&token)?),
        token,
        user,
        record.sequence
    );
    Ok(())
}

/// Publish a new USD price for a token
pub fn set_price(
    ctx: &mut AppContext,
    token: &str,
    price: Decimal,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let token = TokenId::new(token)?;
    let answer = feed_answer(ctx, &token, price)?;

    let record = ctx.execute(
        Command::SetPrice {
            token: token.clone(),
            answer,
        },
        correlation_id,
    )?;

    println!("✅ {} price set to ${} (seq: {})", token, price, record.sequence);
    Ok(())
}

pub fn deposit(
    ctx: &mut AppContext,
    user: &str,
    amount: Decimal,
    token: &str,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let user = Address::new(user)?;
    let token = TokenId::new(token)?;
    let base = collateral_amount(ctx, &token, amount)?;

    let record = ctx.execute(
        Command::Deposit {
            user: user.clone(),
            token: token.clone(),
            amount: base,
        },
        correlation_id,
    )?;

    println!(
        "✅ Deposited {} {} for {} (seq: {})",
        amount, token, user, record.sequence
    );
    Ok(())
}

pub fn withdraw(
    ctx: &mut AppContext,
    user: &str,
    amount: Decimal,
    token: &str,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let user = Address::new(user)?;
    let token = TokenId::new(token)?;
    let base = collateral_amount(ctx, &token, amount)?;

    let record = ctx.execute(
        Command::Withdraw {
            user: user.clone(),
            token: token.clone(),
            amount: base,
        },
        correlation_id,
    )?;

    println!(
        "✅ Withdrew {} {} for {} (seq: {})",
        amount, token, user, record.sequence
    );
    Ok(())
}

pub fn mint(
    ctx: &mut AppContext,
    user: &str,
    amount: Decimal,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let user = Address::new(user)?;
    let base = debt_amount(amount)?;

    let record = ctx.execute(
        Command::Mint {
            user: user.clone(),
            amount: base,
        },
        correlation_id,
    )?;

    println!(
        "✅ Minted {} {} to {} (seq: {})",
        amount, ctx.config.debt_symbol, user, record.sequence
    );
    Ok(())
}

/// Burn the payer's debt tokens against `on_behalf_of`'s debt
pub fn burn(
    ctx: &mut AppContext,
    payer: &str,
    amount: Decimal,
    on_behalf_of: Option<&str>,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let payer = Address::new(payer)?;
    let on_behalf_of = match on_behalf_of {
        Some(user) => Address::new(user)?,
        None => payer.clone(),
    };
    let base = debt_amount(amount)?;

    let record = ctx.execute(
        Command::Burn {
            payer: payer.clone(),
            on_behalf_of: on_behalf_of.clone(),
            amount: base,
        },
        correlation_id,
    )?;

    println!(
        "✅ {} burned {} {} against {}'s debt (seq: {})",
        payer, amount, ctx.config.debt_symbol, on_behalf_of, record.sequence
    );
    Ok(())
}

pub fn deposit_mint(
    ctx: &mut AppContext,
    user: &str,
    collateral: Decimal,
    token: &str,
    debt: Decimal,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let user = Address::new(user)?;
    let token = TokenId::new(token)?;
    let collateral_base = collateral_amount(ctx, &token, collateral)?;
    let debt_base = debt_amount(debt)?;

    let record = ctx.execute(
        Command::DepositAndMint {
            user: user.clone(),
            token: token.clone(),
            collateral: collateral_base,
            debt: debt_base,
        },
        correlation_id,
    )?;

    println!(
        "✅ {} deposited {} {} and minted {} {} (seq: {})",
        user, collateral, token, debt, ctx.config.debt_symbol, record.sequence
    );
    Ok(())
}

pub fn redeem_burn(
    ctx: &mut AppContext,
    user: &str,
    collateral: Decimal,
    token: &str,
    debt: Decimal,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let user = Address::new(user)?;
    let token = TokenId::new(token)?;
    let collateral_base = collateral_amount(ctx, &token, collateral)?;
    let debt_base = debt_amount(debt)?;

    let record = ctx.execute(
        Command::RedeemAndBurn {
            user: user.clone(),
            token: token.clone(),
            collateral: collateral_base,
            debt: debt_base,
        },
        correlation_id,
    )?;

    println!(
        "✅ {} burned {} {} and redeemed {} {} (seq: {})",
        user, debt, ctx.config.debt_symbol, collateral, token, record.sequence
    );
    Ok(())
}

/// Cover part of an unhealthy position's debt in exchange for its collateral
pub fn liquidate(
    ctx: &mut AppContext,
    liquidator: &str,
    target: &str,
    token: &str,
    debt_to_cover: Decimal,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let liquidator = Address::new(liquidator)?;
    let target = Address::new(target)?;
    let token = TokenId::new(token)?;
    let base = debt_amount(debt_to_cover)?;

    let record = ctx.execute(
        Command::Liquidate {
            liquidator: liquidator.clone(),
            target: target.clone(),
            token: token.clone(),
            debt_to_cover: base,
        },
        correlation_id,
    )?;

    println!(
        "✅ {} liquidated {} {} of {}'s debt (seq: {})",
        liquidator, debt_to_cover, ctx.config.debt_symbol, target, record.sequence
    );
    for event in &record.events {
        if let pegbank_ledger::LedgerEvent::PositionLiquidated {
            collateral_seized,
            bonus,
            health_before,
            health_after,
            ..
        } = event
        {
            let decimals = ctx.token_decimals(&token)?;
            println!(
                "   Seized {} {} (bonus {}), health {} -> {}",
                human(*collateral_seized, decimals),
                token,
                human(*bonus, decimals),
                human_hf(*health_before),
                human_hf(*health_after)
            );
        }
    }
    Ok(())
}

/// Move debt tokens between wallets
pub fn transfer_debt(
    ctx: &mut AppContext,
    from: &str,
    to: &str,
    amount: Decimal,
    correlation_id: &str,
) -> anyhow::Result<()> {
    let from = Address::new(from)?;
    let to = Address::new(to)?;
    let base = debt_amount(amount)?;

    let record = ctx.execute(
        Command::TransferDebt {
            from: from.clone(),
            to: to.clone(),
            amount: base,
        },
        correlation_id,
    )?;

    println!(
        "✅ Transferred {} {} from {} to {} (seq: {})",
        amount, ctx.config.debt_symbol, from, to, record.sequence
    );
    Ok(())
}

/// Verify the journal and cross-check the live world against it.
///
/// Returns `Ok(false)` when any check fails; failures are printed, not
/// raised, so every check runs.
pub fn audit(ctx: &AppContext) -> anyhow::Result<bool> {
    let records = JournalReader::from_directory(ctx.journal_path())?.read_all()?;
    let mut ok = true;

    match verify_chain(&records) {
        Ok(()) => println!("✅ Hash chain verified ({} records)", records.len()),
        Err(e) => {
            println!("❌ Hash chain broken: {}", e);
            return Ok(false);
        }
    }

    // Positions rebuilt from recorded events must match the live book
    let live = ctx.engine.positions();
    let mut book = PositionBook::new();
    for event in records.iter().flat_map(|record| record.events.iter()) {
        book.apply_event(event)?;
    }
    let mut rebuilt: Vec<(Address, Position)> = book
        .iter()
        .map(|(user, position)| (user.clone(), position.clone()))
        .collect();
    rebuilt.sort_by(|a, b| a.0.cmp(&b.0));
    if rebuilt == live {
        println!("✅ Event replay matches {} live positions", live.len());
    } else {
        println!("❌ Event replay diverges from live positions");
        ok = false;
    }

    let total_debt = live
        .iter()
        .try_fold(Amount::ZERO, |acc, (_, position)| acc.checked_add(&position.debt()));
    if total_debt == Some(ctx.debt_token_supply()) {
        println!(
            "✅ Debt token supply equals total debt ({})",
            human(ctx.debt_token_supply(), USD_DECIMALS)
        );
    } else {
        println!(
            "❌ Debt token supply {} does not match total debt",
            ctx.debt_token_supply()
        );
        ok = false;
    }

    for config in ctx.engine.registry().iter() {
        let deposited = live.iter().try_fold(Amount::ZERO, |acc, (_, position)| {
            acc.checked_add(&position.collateral_of(&config.token_id))
        });
        let custody = config.token.balance_of(ctx.engine.address());
        if deposited == Some(custody) {
            println!(
                "✅ {} custody covers deposits ({})",
                config.token_id,
                human(custody, config.decimals)
            );
        } else {
            println!(
                "❌ {} custody {} does not match deposits",
                config.token_id, custody
            );
            ok = false;
        }
    }

    let min = ctx.engine.risk_parameters().min_health_factor;
    for (user, _) in &live {
        match ctx.engine.health_factor_of(user) {
            Ok(hf) if hf < min => println!("⚠️  {} is liquidatable (health {})", user, human_hf(hf)),
            Ok(_) => {}
            Err(e) => println!("⚠️  {} health unavailable: {}", user, e),
        }
    }

    Ok(ok)
}
