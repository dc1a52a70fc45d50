//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary with include_str! and applied in
//! name order. Each entry is (filename, sql_content).

/// Name of the bootstrap migration that creates `sys_migrations`
pub const BOOTSTRAP: &str = "000_migrations.sql";

/// All migrations, embedded at compile time.
///
/// New migrations get the next NNN_ prefix and are appended here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    (BOOTSTRAP, include_str!("000_migrations.sql")),
    ("001_wallets.sql", include_str!("001_wallets.sql")),
];
