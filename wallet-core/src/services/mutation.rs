//! Mutation engine - optimistic-concurrency balance updates
//!
//! Each attempt reads the wallet, computes the new balance and issues a
//! conditional update against the version it read. Lost races and store
//! hiccups are retried with exponential backoff; business-rule failures end
//! the operation immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::RetryConfig;
use crate::domain::{Error, ErrorClass, OperationIntent, Result, Wallet};
use crate::ports::{BalanceStore, MutationObserver, NoopObserver};

/// Default number of attempts per operation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry (doubles on every later retry)
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(10);

/// Default upper bound on a single backoff delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1);

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Retry store failures (connection, transaction) like version conflicts.
    /// When false they end the operation on first occurrence.
    pub retry_store_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            retry_store_errors: true,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            retry_store_errors: config.retry_store_errors,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based):
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether `err` is worth another attempt.
    ///
    /// Conflicts always are; transient store failures only while
    /// `retry_store_errors` is set.
    pub fn should_retry(&self, err: &Error) -> bool {
        err.is_retryable() && (err.class() == ErrorClass::Contention || self.retry_store_errors)
    }
}

/// Caller-supplied cancellation and deadline, observed at every suspension
/// point (store calls and backoff sleeps).
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

impl Interrupt {
    fn into_error(self, wallet_id: Uuid, attempts: u32) -> Error {
        match self {
            Interrupt::Cancelled => Error::Cancelled { wallet_id, attempts },
            Interrupt::DeadlineExceeded => Error::DeadlineExceeded { wallet_id, attempts },
        }
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `fut` unless the context is cancelled or its deadline passes first.
    ///
    /// Dropping a store call this way does not undo it: a write interrupted
    /// mid-flight may still commit.
    async fn run<F: Future>(&self, fut: F) -> std::result::Result<F::Output, Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Interrupt::DeadlineExceeded);
        }

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            _ = deadline => Err(Interrupt::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    /// Run a single store call (no retry) under this context
    pub async fn guard<T>(
        &self,
        wallet_id: Uuid,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        self.run(fut)
            .await
            .map_err(|interrupt| interrupt.into_error(wallet_id, 1))?
    }
}

/// Outcome of a failed attempt
enum Step {
    Retry(Error),
    Terminal(Error),
}

/// Applies deposit/withdraw intents with optimistic concurrency and bounded
/// retry. Holds no per-wallet state; any number of engines (or processes)
/// may race on the same wallet and the store decides the winner.
pub struct MutationEngine {
    store: Arc<dyn BalanceStore>,
    policy: RetryPolicy,
    observer: Arc<dyn MutationObserver>,
}

impl MutationEngine {
    pub fn new(store: Arc<dyn BalanceStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replace the lifecycle observer
    pub fn with_observer(mut self, observer: Arc<dyn MutationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Apply a validated intent and return the committed wallet state.
    ///
    /// Terminal failures (`NotFound`, `InsufficientFunds`, `AmountOverflow`,
    /// cancellation, deadline) return at once. Contention and store failures
    /// are retried up to `max_attempts`, after which `RetriesExhausted` wraps
    /// the last cause.
    pub async fn apply(&self, intent: &OperationIntent, ctx: &CallContext) -> Result<Wallet> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;
        let mut attempts = 0;

        for attempt in 1..=max_attempts {
            attempts = attempt;
            self.observer.attempt_started(intent, attempt);

            let cause = match self.attempt(intent, ctx, attempt).await {
                Ok(wallet) => {
                    self.observer.succeeded(intent, &wallet, attempt);
                    return Ok(wallet);
                }
                Err(Step::Terminal(err)) => return Err(self.fail(intent, err, attempt)),
                Err(Step::Retry(err)) => err,
            };

            if attempt == max_attempts {
                last_error = Some(cause);
                break;
            }

            let delay = self.policy.delay_for(attempt);
            self.observer.retry_scheduled(intent, attempt, delay, &cause);
            last_error = Some(cause);

            // No connection is held here; every store call returns its
            // connection before resolving.
            if let Err(interrupt) = ctx.run(tokio::time::sleep(delay)).await {
                let err = interrupt.into_error(intent.wallet_id, attempt);
                return Err(self.fail(intent, err, attempt));
            }
        }

        let source = last_error
            .unwrap_or_else(|| Error::database("operation ended without an attempt"));
        let err = Error::RetriesExhausted {
            wallet_id: intent.wallet_id,
            attempts,
            source: Box::new(source),
        };
        Err(self.fail(intent, err, attempts))
    }

    /// One read-compute-apply pass.
    ///
    /// The read and the conditional update run on separate pooled
    /// connections and nothing is locked in between. A writer that lands in
    /// that gap bumps the version, so the update matches no row and the pass
    /// ends in a `VersionConflict` retry instead of a lost write.
    async fn attempt(
        &self,
        intent: &OperationIntent,
        ctx: &CallContext,
        attempt: u32,
    ) -> std::result::Result<Wallet, Step> {
        let current = self
            .call(intent, ctx, attempt, self.store.get(intent.wallet_id))
            .await?;

        let new_balance = intent.next_balance(&current).map_err(Step::Terminal)?;

        self.call(
            intent,
            ctx,
            attempt,
            self.store
                .conditional_update(intent.wallet_id, current.version, new_balance),
        )
        .await
    }

    async fn call<T>(
        &self,
        intent: &OperationIntent,
        ctx: &CallContext,
        attempt: u32,
        fut: impl Future<Output = Result<T>>,
    ) -> std::result::Result<T, Step> {
        match ctx.run(fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if self.policy.should_retry(&err) => Err(Step::Retry(err)),
            Ok(Err(err)) => Err(Step::Terminal(err)),
            Err(interrupt) => Err(Step::Terminal(interrupt.into_error(intent.wallet_id, attempt))),
        }
    }

    fn fail(&self, intent: &OperationIntent, err: Error, attempts: u32) -> Error {
        self.observer.failed(intent, &err, attempts);
        err
    }
}
