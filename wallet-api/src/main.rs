//! walletd - wallet balance service and admin CLI

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use wallet_core::OperationKind;

mod commands;
mod http;
mod logging;
mod output;

use commands::{migrate, serve, wallet};

/// walletd - versioned wallet balances over HTTP
#[derive(Parser)]
#[command(name = "walletd", version, about, long_about = None)]
struct Cli {
    /// Settings file (.json or .env); defaults to <data dir>/settings.json
    #[arg(long, env = "CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,

    /// Apply pending database migrations
    Migrate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new wallet
    Create {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a wallet
    Show {
        /// Wallet ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deposit into a wallet
    Deposit {
        /// Wallet ID
        id: String,
        /// Amount in minor units
        #[arg(allow_negative_numbers = true)]
        amount: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Withdraw from a wallet
    Withdraw {
        /// Wallet ID
        id: String,
        /// Amount in minor units
        #[arg(allow_negative_numbers = true)]
        amount: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    logging::init(config.env);

    match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Migrate { json } => migrate::run(&config, json),
        Commands::Create { json } => wallet::create(config, json).await,
        Commands::Show { id, json } => wallet::show(config, &id, json).await,
        Commands::Deposit { id, amount, json } => {
            wallet::operate(config, OperationKind::Deposit, &id, amount, json).await
        }
        Commands::Withdraw { id, amount, json } => {
            wallet::operate(config, OperationKind::Withdraw, &id, amount, json).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_amount_reaches_validation() {
        let cli = Cli::try_parse_from(["walletd", "deposit", "abc", "-5"]).unwrap();
        match cli.command {
            Commands::Deposit { amount, .. } => assert_eq!(amount, -5),
            _ => panic!("expected deposit"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["walletd", "show", "abc", "--config", "/tmp/w.env", "--json"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/w.env")));
    }
}
