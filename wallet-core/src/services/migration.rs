//! Migration service - applies embedded schema migrations
//!
//! Each applied migration is recorded in `sys_migrations`, so running the
//! service again is a no-op.

use chrono::Utc;
use duckdb::Connection;
use serde::Serialize;

use crate::adapters::duckdb::format_timestamp;
use crate::domain::Result;
use crate::migrations::{BOOTSTRAP, MIGRATIONS};

/// Result of running migrations
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Apply every migration not yet recorded, in name order
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        if !self.migrations_table_exists()? {
            self.apply(BOOTSTRAP, MIGRATIONS[0].1)?;
            applied.push(BOOTSTRAP.to_string());
        }

        let recorded = self.get_applied()?;
        let already_applied = recorded.len() - applied.len();

        for (name, sql) in MIGRATIONS.iter().filter(|(name, _)| *name != BOOTSTRAP) {
            if !recorded.iter().any(|r| r == name) {
                self.apply(name, sql)?;
                applied.push(name.to_string());
            }
        }

        Ok(MigrationResult {
            applied,
            already_applied,
        })
    }

    /// Names of applied migrations, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(names.collect::<duckdb::Result<Vec<_>>>()?)
    }

    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.migrations_table_exists()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(MIGRATIONS
            .iter()
            .filter(|(name, _)| !applied.iter().any(|a| a == name))
            .map(|(name, _)| name.to_string())
            .collect())
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Run `sql` and record `name` in one transaction, so a failing
    /// migration leaves neither schema changes nor a `sys_migrations` row.
    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = self.conn.execute_batch(sql).and_then(|()| {
            self.conn.execute(
                "INSERT INTO sys_migrations (migration_name, applied_at) VALUES (?, ?)",
                [name, format_timestamp(Utc::now()).as_str()],
            )
        });

        match outcome {
            Ok(_) => {
                self.conn.execute_batch("COMMIT")?;
                tracing::info!(migration = name, "applied migration");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!(migration = name, error = %rollback, "rollback failed");
                }
                tracing::error!(migration = name, error = %e, "migration failed");
                Err(e.into())
            }
        }
    }
}
