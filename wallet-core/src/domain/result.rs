//! Result and error types for the core library

use thiserror::Error;
use uuid::Uuid;

/// Broad category of an [`Error`], used by callers to pick a response class
/// and by monitoring to tell a contention storm apart from a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed request. Never retried.
    Input,
    /// Valid request against a state that does not allow it. Never retried.
    Business,
    /// Lost an optimistic-concurrency race. Retried transparently.
    Contention,
    /// Store or runtime failure. Retried with backoff, server fault if exhausted.
    Infrastructure,
    /// The caller cancelled or its deadline passed.
    Interrupted,
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("invalid operation type: {0:?}")]
    InvalidOperationKind(String),

    #[error("balance overflow on wallet {wallet_id}: {balance} + {amount}")]
    AmountOverflow {
        wallet_id: Uuid,
        balance: i64,
        amount: i64,
    },

    #[error("wallet not found: {0}")]
    NotFound(Uuid),

    #[error("wallet already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("insufficient funds on wallet {wallet_id}: balance {balance}, requested {amount}")]
    InsufficientFunds {
        wallet_id: Uuid,
        balance: i64,
        amount: i64,
    },

    #[error("version conflict on wallet {wallet_id}: expected version {expected_version}")]
    VersionConflict { wallet_id: Uuid, expected_version: i64 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("connection pool exhausted after waiting {0:?}")]
    PoolExhausted(std::time::Duration),

    #[error("operation on wallet {wallet_id} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        wallet_id: Uuid,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("operation on wallet {wallet_id} cancelled after {attempts} attempts")]
    Cancelled { wallet_id: Uuid, attempts: u32 },

    #[error("deadline exceeded for wallet {wallet_id} after {attempts} attempts")]
    DeadlineExceeded { wallet_id: Uuid, attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidAmount(_) | Error::InvalidOperationKind(_) | Error::AmountOverflow { .. } => {
                ErrorClass::Input
            }
            Error::NotFound(_) | Error::AlreadyExists(_) | Error::InsufficientFunds { .. } => {
                ErrorClass::Business
            }
            Error::VersionConflict { .. } => ErrorClass::Contention,
            Error::Cancelled { .. } | Error::DeadlineExceeded { .. } => ErrorClass::Interrupted,
            Error::Database(_)
            | Error::PoolExhausted(_)
            | Error::RetriesExhausted { .. }
            | Error::Config(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorClass::Infrastructure,
        }
    }

    /// True for client-side faults (input and business-rule errors)
    pub fn is_client_fault(&self) -> bool {
        matches!(self.class(), ErrorClass::Input | ErrorClass::Business)
    }

    /// Transient store failures that a fresh attempt may get past.
    ///
    /// `RetriesExhausted` is infrastructure-class but already the end of a
    /// retry loop, and configuration errors never heal on their own.
    pub fn is_transient_store_error(&self) -> bool {
        matches!(self, Error::Database(_) | Error::PoolExhausted(_))
    }

    /// Contention or a transient store failure
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Contention || self.is_transient_store_error()
    }

    /// Message that is safe to hand to an external caller.
    ///
    /// Client faults describe the request; everything else collapses to a
    /// generic message so store internals never leak.
    pub fn public_message(&self) -> String {
        match self.class() {
            ErrorClass::Input | ErrorClass::Business => self.to_string(),
            ErrorClass::Interrupted => match self {
                Error::DeadlineExceeded { .. } => "request deadline exceeded".to_string(),
                _ => "request cancelled".to_string(),
            },
            ErrorClass::Contention | ErrorClass::Infrastructure => match self {
                Error::RetriesExhausted { .. } => {
                    "service temporarily unavailable, please retry".to_string()
                }
                _ => "internal error".to_string(),
            },
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidAmount(_) => "INVALID_AMOUNT",
            Error::InvalidOperationKind(_) => "INVALID_OPERATION_TYPE",
            Error::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            Error::NotFound(_) => "WALLET_NOT_FOUND",
            Error::AlreadyExists(_) => "WALLET_ALREADY_EXISTS",
            Error::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Error::VersionConflict { .. } => "VERSION_CONFLICT",
            Error::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Error::Cancelled { .. } => "CANCELLED",
            Error::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            Error::Database(_)
            | Error::PoolExhausted(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Json(_) => "INTERNAL",
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
