//! Wallet service - create, read and mutate wallets

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{validate, OperationIntent, OperationRequest, Result, Wallet};
use crate::ports::BalanceStore;
use crate::services::mutation::{CallContext, MutationEngine};

/// Entry point for every wallet use case.
///
/// Reads and creates go straight to the store; operations are validated and
/// then handed to the [`MutationEngine`].
pub struct WalletService {
    store: Arc<dyn BalanceStore>,
    engine: MutationEngine,
}

impl WalletService {
    pub fn new(store: Arc<dyn BalanceStore>, engine: MutationEngine) -> Self {
        Self { store, engine }
    }

    /// Create a wallet under a fresh id
    pub async fn create(&self, ctx: &CallContext) -> Result<Wallet> {
        self.create_with_id(Uuid::new_v4(), ctx).await
    }

    pub async fn create_with_id(&self, id: Uuid, ctx: &CallContext) -> Result<Wallet> {
        let wallet = ctx.guard(id, self.store.create(id)).await?;
        tracing::info!(wallet_id = %wallet.id, "wallet created");
        Ok(wallet)
    }

    pub async fn get(&self, id: Uuid, ctx: &CallContext) -> Result<Wallet> {
        ctx.guard(id, self.store.get(id)).await
    }

    /// Validate an operation request and apply it.
    ///
    /// Invalid requests fail here without touching the store.
    pub async fn submit(&self, request: &OperationRequest, ctx: &CallContext) -> Result<Wallet> {
        let intent = validate(request)?;
        self.engine.apply(&intent, ctx).await
    }

    pub async fn deposit(&self, id: Uuid, amount: i64, ctx: &CallContext) -> Result<Wallet> {
        let intent = OperationIntent::deposit(id, amount)?;
        self.engine.apply(&intent, ctx).await
    }

    pub async fn withdraw(&self, id: Uuid, amount: i64, ctx: &CallContext) -> Result<Wallet> {
        let intent = OperationIntent::withdraw(id, amount)?;
        self.engine.apply(&intent, ctx).await
    }

    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbStore;
    use crate::domain::Error;
    use crate::services::mutation::RetryPolicy;

    fn service() -> WalletService {
        let store: Arc<dyn BalanceStore> = Arc::new(DuckDbStore::open_in_memory().unwrap());
        let engine = MutationEngine::new(Arc::clone(&store), RetryPolicy::default());
        WalletService::new(store, engine)
    }

    #[tokio::test]
    async fn test_submit_deposit_and_withdraw() {
        let service = service();
        let ctx = CallContext::new();
        let wallet = service.create(&ctx).await.unwrap();

        let after = service
            .submit(&OperationRequest::new(wallet.id, "DEPOSIT", 500), &ctx)
            .await
            .unwrap();
        assert_eq!((after.balance, after.version), (500, 2));

        let after = service
            .submit(&OperationRequest::new(wallet.id, "WITHDRAW", 200), &ctx)
            .await
            .unwrap();
        assert_eq!((after.balance, after.version), (300, 3));
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_requests_before_store() {
        let service = service();
        let ctx = CallContext::new();
        let missing = Uuid::new_v4();

        // Validation runs first, so an unknown wallet still reports the input error
        let err = service
            .submit(&OperationRequest::new(missing, "DEPOSIT", 0), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(0)));

        let err = service
            .submit(&OperationRequest::new(missing, "TRANSFER", 10), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperationKind(_)));
    }

    #[tokio::test]
    async fn test_get_respects_cancelled_context() {
        let service = service();
        let wallet = service.create(&CallContext::new()).await.unwrap();

        let ctx = CallContext::new();
        ctx.cancel_token().cancel();
        let err = service.get(wallet.id, &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_create_with_existing_id() {
        let service = service();
        let ctx = CallContext::new();
        let wallet = service.create(&ctx).await.unwrap();

        let err = service.create_with_id(wallet.id, &ctx).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }
}
