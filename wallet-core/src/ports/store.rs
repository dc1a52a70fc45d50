//! Balance store port - durable wallet state

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::Wallet;

/// Durable record of wallet state.
///
/// Implementations own the stored wallets exclusively and must guarantee that
/// two concurrent `conditional_update` calls for the same wallet and the same
/// `expected_version` never both succeed.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Insert a new wallet with balance 0 and version 1.
    ///
    /// Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, id: Uuid) -> Result<Wallet>;

    /// Fetch the current state of a wallet. Fails with `NotFound` if absent.
    async fn get(&self, id: Uuid) -> Result<Wallet>;

    /// Set the balance and bump the version by one, only if the stored
    /// version still equals `expected_version`.
    ///
    /// Fails with `VersionConflict` when another writer advanced the version
    /// first, and with `NotFound` when the wallet is gone.
    async fn conditional_update(
        &self,
        id: Uuid,
        expected_version: i64,
        new_balance: i64,
    ) -> Result<Wallet>;
}
