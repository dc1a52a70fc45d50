//! Mutation observer port - lifecycle hooks for the mutation engine

use std::time::Duration;

use crate::domain::{Error, OperationIntent, Wallet};

/// Receives structured notifications as the engine works through an intent.
///
/// All methods default to no-ops so implementations only override what they
/// care about. Calls happen inline on the engine's task and must not block.
pub trait MutationObserver: Send + Sync {
    /// An attempt (1-based) is about to read the wallet
    fn attempt_started(&self, _intent: &OperationIntent, _attempt: u32) {}

    /// Attempt `attempt` failed with a retryable `cause`; the engine will
    /// sleep for `delay` and try again.
    fn retry_scheduled(
        &self,
        _intent: &OperationIntent,
        _attempt: u32,
        _delay: Duration,
        _cause: &Error,
    ) {
    }

    /// The mutation committed on attempt `attempts`
    fn succeeded(&self, _intent: &OperationIntent, _wallet: &Wallet, _attempts: u32) {}

    /// The mutation ended without committing. `error` is the classified
    /// error returned to the caller.
    fn failed(&self, _intent: &OperationIntent, _error: &Error, _attempts: u32) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MutationObserver for NoopObserver {}
