//! DuckDB balance store

use std::path::Path;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use uuid::Uuid;

use crate::adapters::pool::ConnectionPool;
use crate::config::{Config, DatabaseConfig, DatabaseLocation};
use crate::domain::{Error, Result, Wallet};
use crate::ports::BalanceStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum attempts when the database file is locked by another process
const MAX_OPEN_ATTEMPTS: u32 = 5;

/// Initial delay between open attempts (doubles each time: 50, 100, 200, 400ms)
const INITIAL_OPEN_DELAY_MS: u64 = 50;

const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const SELECT_WALLET: &str = "SELECT id, balance, created_at::VARCHAR, updated_at::VARCHAR, version \
                             FROM wallets WHERE id = ?";

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::Database(err.to_string())
    }
}

/// Check if an open error means the file is held by someone else
fn is_lock_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock")
        || lower.contains("file is already open")
}

/// Transaction conflicts surface as errors mentioning "conflict"
fn is_conflict_error(err: &duckdb::Error) -> bool {
    err.to_string().to_lowercase().contains("conflict")
}

fn is_duplicate_key_error(err: &duckdb::Error) -> bool {
    let lower = err.to_string().to_lowercase();
    lower.contains("duplicate key") || lower.contains("primary key constraint")
}

/// Render a timestamp the way the store writes it (naive UTC, microseconds)
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_WRITE_FORMAT).to_string()
}

/// Parse a `TIMESTAMP::VARCHAR` value read back from the store
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_READ_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::database(format!("invalid stored timestamp '{raw}': {e}")))
}

type WalletRow = (String, i64, String, String, i64);

fn wallet_from_row(row: WalletRow) -> Result<Wallet> {
    let (id, balance, created_at, updated_at, version) = row;
    Ok(Wallet {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::database(format!("invalid stored wallet id '{id}': {e}")))?,
        balance,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        version,
    })
}

fn select_wallet(conn: &Connection, id: Uuid) -> Result<Wallet> {
    let row = conn
        .query_row(SELECT_WALLET, [id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .map_err(|e| match e {
            duckdb::Error::QueryReturnedNoRows => Error::NotFound(id),
            other => other.into(),
        })?;
    wallet_from_row(row)
}

fn insert_wallet(conn: &Connection, id: Uuid) -> Result<Wallet> {
    let wallet = Wallet::new(id);
    conn.execute(
        "INSERT INTO wallets (id, balance, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?)",
        params![
            id.to_string(),
            wallet.balance,
            format_timestamp(wallet.created_at),
            format_timestamp(wallet.updated_at),
            wallet.version,
        ],
    )
    .map_err(|e| {
        if is_duplicate_key_error(&e) {
            Error::AlreadyExists(id)
        } else {
            e.into()
        }
    })?;
    select_wallet(conn, id)
}

fn update_wallet(
    conn: &mut Connection,
    id: Uuid,
    expected_version: i64,
    new_balance: i64,
) -> Result<Wallet> {
    let conflict = |e: duckdb::Error| {
        if is_conflict_error(&e) {
            Error::VersionConflict {
                wallet_id: id,
                expected_version,
            }
        } else {
            Error::from(e)
        }
    };

    let tx = conn.transaction()?;
    let updated = tx
        .execute(
            "UPDATE wallets SET balance = ?, updated_at = ?, version = version + 1 \
             WHERE id = ? AND version = ?",
            params![
                new_balance,
                format_timestamp(Utc::now()),
                id.to_string(),
                expected_version,
            ],
        )
        .map_err(conflict)?;

    if updated == 0 {
        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM wallets WHERE id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        return Err(if exists == 0 {
            Error::NotFound(id)
        } else {
            Error::VersionConflict {
                wallet_id: id,
                expected_version,
            }
        });
    }

    let wallet = select_wallet(&tx, id)?;
    tx.commit().map_err(conflict)?;
    Ok(wallet)
}

/// Wallet store backed by DuckDB
pub struct DuckDbStore {
    pool: ConnectionPool,
    location: DatabaseLocation,
}

impl DuckDbStore {
    /// Open the database described by `settings`.
    ///
    /// A file held by another process is retried with exponential backoff
    /// before giving up.
    pub fn open(settings: &DatabaseConfig) -> Result<Self> {
        let mut attempt = 0;
        let conn = loop {
            match Self::try_open_connection(&settings.location) {
                Ok(conn) => break conn,
                Err(e) => {
                    let err_msg = e.to_string();
                    attempt += 1;
                    if !is_lock_error(&err_msg) || attempt >= MAX_OPEN_ATTEMPTS {
                        return Err(Error::database(format!(
                            "failed to open database {}: {err_msg}",
                            settings.location
                        )));
                    }
                    let delay = Duration::from_millis(INITIAL_OPEN_DELAY_MS * 2u64.pow(attempt - 1));
                    tracing::warn!(
                        location = %settings.location,
                        attempt,
                        max_attempts = MAX_OPEN_ATTEMPTS,
                        delay_ms = delay.as_millis() as u64,
                        error = %err_msg,
                        "database busy, retrying open"
                    );
                    thread::sleep(delay);
                }
            }
        };

        Ok(Self {
            pool: ConnectionPool::new(conn, settings),
            location: settings.location.clone(),
        })
    }

    /// Fresh in-memory store with the schema applied
    pub fn open_in_memory() -> Result<Self> {
        let store = Self::open(&Config::default().database)?;
        store.ensure_schema()?;
        Ok(store)
    }

    fn try_open_connection(location: &DatabaseLocation) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = match location {
            DatabaseLocation::InMemory => Connection::open_in_memory_with_flags(config)?,
            DatabaseLocation::File(path) => {
                ensure_parent_dir(path)?;
                Connection::open_with_flags(path, config)?
            }
        };
        Ok(conn)
    }

    /// Apply pending migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        self.pool
            .with_root(|conn| MigrationService::new(conn).run_pending())
    }

    /// Ensure the schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::debug!(applied = ?result.applied, "schema migrated");
        }
        Ok(())
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run blocking store work on a pooled connection.
    ///
    /// The connection goes back to the pool as soon as `f` returns.
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let mut conn = self.pool.acquire().await?;
        tokio::task::spawn_blocking(move || f(&mut conn))
            .await
            .map_err(|e| Error::database(format!("store task failed: {e}")))?
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[async_trait]
impl BalanceStore for DuckDbStore {
    async fn create(&self, id: Uuid) -> Result<Wallet> {
        self.with_connection(move |conn| insert_wallet(conn, id)).await
    }

    async fn get(&self, id: Uuid) -> Result<Wallet> {
        self.with_connection(move |conn| select_wallet(conn, id)).await
    }

    async fn conditional_update(
        &self,
        id: Uuid,
        expected_version: i64,
        new_balance: i64,
    ) -> Result<Wallet> {
        if new_balance < 0 {
            return Err(Error::InvalidAmount(new_balance));
        }
        self.with_connection(move |conn| update_wallet(conn, id, expected_version, new_balance))
            .await
    }
}
