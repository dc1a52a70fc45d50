//! Wallet commands - create, show, deposit, withdraw
//!
//! These go through the same validation and mutation engine as the HTTP API.

use anyhow::{Context, Result};
use uuid::Uuid;
use wallet_core::config::Config;
use wallet_core::services::EntryPoint;
use wallet_core::{CallContext, OperationKind, OperationRequest, Wallet};

use super::get_context;
use crate::output;

fn print_wallet(wallet: &Wallet, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(wallet)?);
    } else {
        println!("{}", output::wallet_table(wallet));
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid wallet id: {raw}"))
}

fn call_context(config: &Config) -> CallContext {
    CallContext::new().with_timeout(config.server.request_timeout)
}

pub async fn create(config: Config, json: bool) -> Result<()> {
    let call = call_context(&config);
    let ctx = get_context(config, EntryPoint::Cli)?;
    let wallet = ctx
        .wallet_service
        .create(&call)
        .await
        .context("failed to create wallet")?;

    if !json {
        output::success("Wallet created");
    }
    print_wallet(&wallet, json)
}

pub async fn show(config: Config, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let call = call_context(&config);
    let ctx = get_context(config, EntryPoint::Cli)?;
    let wallet = ctx.wallet_service.get(id, &call).await?;
    print_wallet(&wallet, json)
}

/// Submit a deposit or withdrawal
pub async fn operate(
    config: Config,
    kind: OperationKind,
    id: &str,
    amount: i64,
    json: bool,
) -> Result<()> {
    let request = OperationRequest::new(parse_id(id)?, kind.as_str(), amount);
    let call = call_context(&config);
    let ctx = get_context(config, EntryPoint::Cli)?;
    let wallet = ctx.wallet_service.submit(&request, &call).await?;

    if !json {
        output::success(&format!(
            "{} of {} applied",
            kind,
            output::format_minor_units(amount)
        ));
    }
    print_wallet(&wallet, json)
}
