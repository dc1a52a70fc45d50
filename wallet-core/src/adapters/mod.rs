//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the BalanceStore port
//! - A bounded connection pool shared by the store's calls

pub mod duckdb;
pub mod pool;
