//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use wallet_core::Wallet;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format minor units as a decimal amount with two places (12345 -> "123.45")
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Key-value table describing one wallet
pub fn wallet_table(wallet: &Wallet) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["ID".to_string(), wallet.id.to_string()]);
    table.add_row(vec![
        "Balance".to_string(),
        format!("{} ({} minor units)", format_minor_units(wallet.balance), wallet.balance),
    ]);
    table.add_row(vec!["Version".to_string(), wallet.version.to_string()]);
    table.add_row(vec![
        "Created".to_string(),
        wallet.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ]);
    table.add_row(vec![
        "Updated".to_string(),
        wallet.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ]);
    table
}
