//! PegBank CLI - Main entry point

use clap::{Parser, Subcommand};
use pegbank_rpc::{commands, AppContext};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pegbank")]
#[command(about = "PegBank - Overcollateralized stablecoin engine", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the configuration and publish initial prices
    Init,

    /// List collateral assets, prices and custody balances
    Assets,

    /// Show a user's position, wallet and health factor
    Position {
        /// User address (will be uppercased)
        user: String,
    },

    /// Verify the journal hash chain and cross-check the world
    Audit,

    /// Mint simulated collateral tokens to a wallet
    Faucet {
        user: String,
        amount: Decimal,
        token: String,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Publish a USD price for a collateral token
    SetPrice {
        token: String,
        price: Decimal,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Move debt tokens between wallets
    TransferDebt {
        from: String,
        to: String,
        amount: Decimal,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Deposit collateral
    Deposit {
        user: String,
        amount: Decimal,
        token: String,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Withdraw collateral
    Withdraw {
        user: String,
        amount: Decimal,
        token: String,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Mint debt tokens against deposited collateral
    Mint {
        user: String,
        amount: Decimal,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Burn debt tokens to repay debt
    Burn {
        /// Wallet paying the debt tokens
        payer: String,
        amount: Decimal,
        /// Repay this user's debt instead of the payer's
        #[arg(long)]
        on_behalf_of: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Deposit collateral and mint debt in one step
    DepositMint {
        user: String,
        collateral: Decimal,
        token: String,
        debt: Decimal,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Burn debt and redeem collateral in one step
    RedeemBurn {
        user: String,
        collateral: Decimal,
        token: String,
        debt: Decimal,
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Liquidate an unhealthy position
    Liquidate {
        liquidator: String,
        target: String,
        /// Collateral token to seize
        token: String,
        /// Debt to cover, in debt-token units
        debt: Decimal,
        #[arg(long)]
        correlation_id: Option<String>,
    },
}

fn correlation(id: Option<String>) -> String {
    id.unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Rebuilds the world from the journal
    let mut ctx = AppContext::new(&cli.data)?;

    match cli.command {
        Commands::Init => {
            commands::init(&mut ctx, &Uuid::new_v4().to_string())?;
        }

        Commands::Assets => commands::assets(&ctx)?,

        Commands::Position { user } => commands::position(&ctx, &user)?,

        Commands::Audit => {
            if !commands::audit(&ctx)? {
                anyhow::bail!("Audit failed");
            }
        }

        Commands::Faucet {
            user,
            amount,
            token,
            correlation_id,
        } => {
            commands::faucet(&mut ctx, &user, amount, &token, &correlation(correlation_id))?;
        }

        Commands::SetPrice {
            token,
            price,
            correlation_id,
        } => {
            commands::set_price(&mut ctx, &token, price, &correlation(correlation_id))?;
        }

        Commands::TransferDebt {
            from,
            to,
            amount,
            correlation_id,
        } => {
            commands::transfer_debt(&mut ctx, &from, &to, amount, &correlation(correlation_id))?;
        }

        Commands::Deposit {
            user,
            amount,
            token,
            correlation_id,
        } => {
            commands::deposit(&mut ctx, &user, amount, &token, &correlation(correlation_id))?;
        }

        Commands::Withdraw {
            user,
            amount,
            token,
            correlation_id,
        } => {
            commands::withdraw(&mut ctx, &user, amount, &token, &correlation(correlation_id))?;
        }

        Commands::Mint {
            user,
            amount,
            correlation_id,
        } => {
            commands::mint(&mut ctx, &user, amount, &correlation(correlation_id))?;
        }

        Commands::Burn {
            payer,
            amount,
            on_behalf_of,
            correlation_id,
        } => {
            commands::burn(
                &mut ctx,
                &payer,
                amount,
                on_behalf_of.as_deref(),
                &correlation(correlation_id),
            )?;
        }

        Commands::DepositMint {
            user,
            collateral,
            token,
            debt,
            correlation_id,
        } => {
            commands::deposit_mint(
                &mut ctx,
                &user,
                collateral,
                &token,
                debt,
                &correlation(correlation_id),
            )?;
        }

        Commands::RedeemBurn {
            user,
            collateral,
            token,
            debt,
            correlation_id,
        } => {
            commands::redeem_burn(
                &mut ctx,
                &user,
                collateral,
                &token,
                debt,
                &correlation(correlation_id),
            )?;
        }

        Commands::Liquidate {
            liquidator,
            target,
            token,
            debt,
            correlation_id,
        } => {
            commands::liquidate(
                &mut ctx,
                &liquidator,
                &target,
                &token,
                debt,
                &correlation(correlation_id),
            )?;
        }
    }

    Ok(())
}
