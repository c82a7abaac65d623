//! Application context - wires everything together
//!
//! The CLI runs against a simulated world: one `SimpleToken` and one
//! `MockFeed` per configured asset, a `StableToken` whose mint authority is
//! handed to the engine, and a manual clock. None of it is persisted
//! directly; the world is rebuilt on every start by re-executing the
//! journal with the clock pinned to each record's timestamp.

use chrono::{DateTime, Utc};
use pegbank_core::{Address, Amount, IdError, TokenId};
use pegbank_engine::{CollateralEngine, EngineError};
use pegbank_events::{
    verify_chain, Command, EventError, JournalReader, JournalRecord, JournalStore,
};
use pegbank_ledger::{CollateralToken, DebtToken, LedgerEvent, SimpleToken, StableToken};
use pegbank_oracle::{Clock, ManualClock, MockFeed, PriceFeed};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AppConfig, CONFIG_FILE};

/// Errors while building the world or executing a command
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Journal error: {0}")]
    Event(#[from] EventError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown token: {0}")]
    UnknownToken(TokenId),

    #[error("Faucet could not mint {amount} {token} to {user}")]
    FaucetFailed {
        user: Address,
        token: TokenId,
        amount: Amount,
    },

    #[error("Transfer of {amount} debt tokens from {from} to {to} failed")]
    DebtTransferFailed {
        from: Address,
        to: Address,
        amount: Amount,
    },

    #[error("Replay diverged at seq {sequence}: {reason}")]
    ReplayDivergence { sequence: u64, reason: String },
}

impl From<IdError> for AppError {
    fn from(err: IdError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Event(EventError::Io(err))
    }
}

/// Simulated tokens and feeds, one per listed asset
struct Asset {
    token: Arc<SimpleToken>,
    feed: Arc<MockFeed>,
}

/// Application context - the engine plus its simulated surroundings
pub struct AppContext {
    pub config: AppConfig,
    pub engine: CollateralEngine,
    clock: Arc<ManualClock>,
    assets: BTreeMap<TokenId, Asset>,
    stable: Arc<StableToken>,
    store: JournalStore,
    data_path: PathBuf,
    journal_path: PathBuf,
}

impl AppContext {
    /// Load configuration and rebuild the world from the journal
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let data_path = data_path.as_ref().to_path_buf();
        let journal_path = data_path.join("journal");
        std::fs::create_dir_all(&journal_path)?;

        let config = AppConfig::load(&data_path)?;
        let engine_address = config.engine_address()?;

        // Feeds start out stale; `init` publishes the first prices
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut assets = BTreeMap::new();
        let mut tokens: Vec<Arc<dyn CollateralToken>> = Vec::new();
        let mut feeds: Vec<Arc<dyn PriceFeed>> = Vec::new();
        for spec in &config.assets {
            let answer = spec.answer_for(spec.initial_price).ok_or_else(|| {
                AppError::Config(format!(
                    "initial price {} of {} is not a valid feed answer",
                    spec.initial_price, spec.symbol
                ))
            })?;
            let token = Arc::new(SimpleToken::new(spec.symbol.clone(), spec.decimals));
            let feed = Arc::new(MockFeed::new(
                format!("{} / USD", spec.symbol),
                spec.feed_decimals,
                answer,
                DateTime::<Utc>::UNIX_EPOCH,
            ));
            tokens.push(token.clone());
            feeds.push(feed.clone());
            assets.insert(spec.symbol.clone(), Asset { token, feed });
        }

        let (stable, authority) = StableToken::issue(config.debt_symbol.clone(), engine_address.clone());
        let stable = Arc::new(stable);

        let engine = CollateralEngine::builder()
            .address(engine_address)
            .collateral_lists(tokens, feeds)
            .debt_token(stable.clone(), authority)
            .clock(clock.clone())
            .risk_parameters(config.risk.clone())
            .staleness_timeout(config.staleness_timeout_secs)
            .build()?;

        let records = JournalReader::from_directory(&journal_path)?.read_all()?;
        let store = JournalStore::open(&journal_path)?;

        let mut ctx = Self {
            config,
            engine,
            clock,
            assets,
            stable,
            store,
            data_path,
            journal_path,
        };
        ctx.replay(&records)?;
        Ok(ctx)
    }

    /// Run `command` now and journal it if it succeeds
    pub fn execute(
        &mut self,
        command: Command,
        correlation_id: &str,
    ) -> Result<JournalRecord, AppError> {
        self.clock.set(Utc::now());
        let events = self.apply(&command)?;
        let record = self
            .store
            .append(self.clock.now(), correlation_id, command, events)?;
        Ok(record)
    }

    /// Re-execute journaled commands and check they produce the same events
    fn replay(&mut self, records: &[JournalRecord]) -> Result<(), AppError> {
        verify_chain(records).map_err(EventError::from)?;

        for record in records {
            self.clock.set(record.timestamp);
            let events = self.apply(&record.command).map_err(|e| AppError::ReplayDivergence {
                sequence: record.sequence,
                reason: e.to_string(),
            })?;
            if events != record.events {
                return Err(AppError::ReplayDivergence {
                    sequence: record.sequence,
                    reason: format!(
                        "{} produced {} events, journal has {}",
                        record.command,
                        events.len(),
                        record.events.len()
                    ),
                });
            }
        }

        if !records.is_empty() {
            tracing::info!(records = records.len(), "Rebuilt world from journal");
        }
        Ok(())
    }

    fn apply(&self, command: &Command) -> Result<Vec<LedgerEvent>, AppError> {
        let receipt = match command {
            Command::Faucet {
                user,
                token,
                amount,
            } => {
                if !self.asset(token)?.token.mint_to(user, *amount) {
                    return Err(AppError::FaucetFailed {
                        user: user.clone(),
                        token: token.clone(),
                        amount: *amount,
                    });
                }
                return Ok(Vec::new());
            }
            Command::SetPrice { token, answer } => {
                self.asset(token)?.feed.set_answer(*answer, self.clock.now());
                return Ok(Vec::new());
            }
            Command::TransferDebt { from, to, amount } => {
                if !self.stable.transfer(from, to, *amount) {
                    return Err(AppError::DebtTransferFailed {
                        from: from.clone(),
                        to: to.clone(),
                        amount: *amount,
                    });
                }
                return Ok(Vec::new());
            }
            Command::Deposit {
                user,
                token,
                amount,
            } => self.engine.deposit_collateral(user, token, *amount)?,
            Command::Withdraw {
                user,
                token,
                amount,
            } => self.engine.withdraw_collateral(user, token, *amount)?,
            Command::Mint { user, amount } => self.engine.mint_debt(user, *amount)?,
            Command::Burn {
                payer,
                on_behalf_of,
                amount,
            } => self.engine.burn_debt(payer, on_behalf_of, *amount)?,
            Command::DepositAndMint {
                user,
                token,
                collateral,
                debt,
            } => self
                .engine
                .deposit_and_mint(user, token, *collateral, *debt)?,
            Command::RedeemAndBurn {
                user,
                token,
                collateral,
                debt,
            } => self
                .engine
                .redeem_and_burn(user, token, *collateral, *debt)?,
            Command::Liquidate {
                liquidator,
                target,
                token,
                debt_to_cover,
            } => self
                .engine
                .liquidate(liquidator, target, token, *debt_to_cover)?,
        };
        Ok(receipt.events)
    }

    fn asset(&self, token: &TokenId) -> Result<&Asset, AppError> {
        self.assets
            .get(token)
            .ok_or_else(|| AppError::UnknownToken(token.clone()))
    }

    /// Wallet balance of a simulated collateral token
    pub fn wallet_balance(&self, user: &Address, token: &TokenId) -> Result<Amount, AppError> {
        Ok(self.asset(token)?.token.balance_of(user))
    }

    /// Wallet balance of the debt token
    pub fn debt_token_balance(&self, user: &Address) -> Amount {
        self.stable.balance_of(user)
    }

    pub fn debt_token_supply(&self) -> Amount {
        self.stable.total_supply()
    }

    /// Token decimals from the engine's registry
    pub fn token_decimals(&self, token: &TokenId) -> Result<u8, AppError> {
        Ok(self
            .engine
            .registry()
            .asset(token)
            .map_err(EngineError::from)?
            .decimals)
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Persist the current configuration
    pub fn save_config(&self) -> Result<(), AppError> {
        self.config.save(&self.data_path)?;
        Ok(())
    }

    /// Initialized once `pegbank.json` has been written
    pub fn is_initialized(&self) -> bool {
        self.data_path.join(CONFIG_FILE).exists()
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    pub fn last_sequence(&self) -> u64 {
        self.store.last_sequence()
    }
}
