//! Concurrent mutation tests
//!
//! Many tasks race on the same wallet. The store decides every race, so the
//! final balance must match the committed operations exactly and never go
//! negative.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::Barrier;
use uuid::Uuid;

use wallet_core::adapters::duckdb::DuckDbStore;
use wallet_core::config::{Config, DatabaseLocation};
use wallet_core::ports::BalanceStore;
use wallet_core::services::{MutationEngine, RetryPolicy, WalletService};
use wallet_core::{CallContext, Error, OperationIntent};

/// Number of concurrent tasks for stress tests
const TASK_COUNT: usize = 12;

/// Generous policy so contention alone rarely exhausts an operation
fn patient_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 200,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        retry_store_errors: true,
    }
}

fn file_store(temp_dir: &TempDir) -> Arc<DuckDbStore> {
    let mut settings = Config::default().database;
    settings.location = DatabaseLocation::File(temp_dir.path().join("concurrent.duckdb"));
    let store = DuckDbStore::open(&settings).unwrap();
    store.ensure_schema().unwrap();
    Arc::new(store)
}

/// Two writers holding the same version: exactly one commits.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_version_race_has_one_winner() {
    let store = Arc::new(DuckDbStore::open_in_memory().unwrap());

    for _ in 0..10 {
        let id = Uuid::new_v4();
        store.create(id).await.unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for new_balance in [100, 200] {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                store.conditional_update(id, 1, new_balance).await
            }));
        }

        let mut winners = Vec::new();
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(wallet) => winners.push(wallet),
                Err(Error::VersionConflict { expected_version: 1, .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(winners.len(), 1, "exactly one writer must win");
        assert_eq!(conflicts, 1);

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.balance, winners[0].balance);
    }
}

/// Concurrent deposits on a file database: every committed deposit is counted once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_are_not_lost() {
    let temp_dir = TempDir::new().unwrap();
    let store = file_store(&temp_dir);
    let engine = Arc::new(MutationEngine::new(store.clone(), patient_policy()));

    let id = Uuid::new_v4();
    store.create(id).await.unwrap();

    let barrier = Arc::new(Barrier::new(TASK_COUNT));
    let mut handles = Vec::new();
    for _ in 0..TASK_COUNT {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let intent = OperationIntent::deposit(id, 10).unwrap();
            engine.apply(&intent, &CallContext::new()).await
        }));
    }

    let mut committed = 0i64;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(Error::RetriesExhausted { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    println!("{committed}/{TASK_COUNT} deposits committed");
    assert!(committed > 0);

    let wallet = store.get(id).await.unwrap();
    assert_eq!(wallet.balance, committed * 10);
    assert_eq!(wallet.version, 1 + committed);
}

/// Racing withdrawals never overdraw the wallet.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_go_negative() {
    let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
    let engine = MutationEngine::new(store.clone(), patient_policy());
    let service = Arc::new(WalletService::new(store.clone(), engine));

    let call = CallContext::new();
    let wallet = service.create(&call).await.unwrap();
    service.deposit(wallet.id, 100, &call).await.unwrap();

    let barrier = Arc::new(Barrier::new(TASK_COUNT));
    let mut handles = Vec::new();
    for _ in 0..TASK_COUNT {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.withdraw(wallet.id, 30, &CallContext::new()).await
        }));
    }

    let mut withdrawn = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(w) => {
                assert!(w.balance >= 0);
                withdrawn += 1;
            }
            Err(Error::InsufficientFunds { .. }) | Err(Error::RetriesExhausted { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert!(withdrawn <= 3, "only three withdrawals of 30 fit in 100");
    let stored = service.get(wallet.id, &call).await.unwrap();
    assert_eq!(stored.balance, 100 - 30 * withdrawn);
    assert_eq!(stored.version, 2 + withdrawn);
}
