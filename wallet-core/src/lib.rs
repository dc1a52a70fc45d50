//! Wallet Core - versioned wallet balances with optimistic concurrency
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Wallet, operations, validation and the error taxonomy
//! - **ports**: Trait definitions for external dependencies (BalanceStore, MutationObserver)
//! - **services**: Mutation engine, wallet facade, migrations, tracing observer
//! - **adapters**: DuckDB store and its connection pool

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbStore;
use config::Config;
use ports::BalanceStore;
use services::{EntryPoint, MutationEngine, RetryPolicy, TracingObserver, WalletService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorClass, Result};
pub use domain::{OperationIntent, OperationKind, OperationRequest, Wallet};
pub use services::CallContext;

/// Main context for wallet operations
///
/// Holds the configuration, the store and the service built on top of it.
/// Construct once per process and share.
pub struct WalletContext {
    pub config: Config,
    pub store: Arc<DuckDbStore>,
    pub wallet_service: WalletService,
}

impl WalletContext {
    /// Open the configured store, provision its schema and wire the services
    pub fn new(config: Config, entry_point: EntryPoint) -> Result<Self> {
        let store = Arc::new(DuckDbStore::open(&config.database)?);
        store.ensure_schema()?;

        let balance_store: Arc<dyn BalanceStore> = store.clone();
        let engine = MutationEngine::new(Arc::clone(&balance_store), RetryPolicy::from(&config.retry))
            .with_observer(Arc::new(TracingObserver::new(entry_point)));
        let wallet_service = WalletService::new(balance_store, engine);

        tracing::debug!(
            database = %config.database.location,
            env = %config.env,
            "wallet context ready"
        );

        Ok(Self {
            config,
            store,
            wallet_service,
        })
    }

    /// Load configuration from `data_dir` (and an optional explicit file)
    /// and build the context
    pub fn load(data_dir: &Path, config_path: Option<&Path>, entry_point: EntryPoint) -> Result<Self> {
        let config = Config::load(data_dir, config_path)?;
        Self::new(config, entry_point)
    }
}
