//! Migrate command - provision the database schema

use anyhow::{Context, Result};
use colored::Colorize;
use wallet_core::adapters::duckdb::DuckDbStore;
use wallet_core::config::Config;

use crate::output;

pub fn run(config: &Config, json: bool) -> Result<()> {
    let store = DuckDbStore::open(&config.database)
        .with_context(|| format!("failed to open database at {}", config.database.location))?;
    let result = store.run_migrations().context("failed to apply migrations")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} {}", "Database:".bold(), config.database.location);
    if result.applied.is_empty() {
        output::info(&format!(
            "Schema up to date ({} migrations already applied)",
            result.already_applied
        ));
    } else {
        for name in &result.applied {
            println!("  {} {}", "+".green(), name);
        }
        output::success(&format!("Applied {} migration(s)", result.applied.len()));
    }
    Ok(())
}
