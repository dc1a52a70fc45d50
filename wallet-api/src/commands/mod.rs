//! CLI command implementations

pub mod migrate;
pub mod serve;
pub mod wallet;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use wallet_core::config::Config;
use wallet_core::services::EntryPoint;
use wallet_core::WalletContext;

/// Data directory from `WALLET_DIR`, else `~/.walletd`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WALLET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("could not find home directory")?;
    Ok(home.join(".walletd"))
}

/// Load the layered configuration, creating the data directory if needed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    Config::load(&data_dir, config_path).context("failed to load configuration")
}

/// Build the wallet context for a command
pub fn get_context(config: Config, entry_point: EntryPoint) -> Result<WalletContext> {
    let location = config.database.location.to_string();
    WalletContext::new(config, entry_point)
        .with_context(|| format!("failed to open wallet database at {location}"))
}
