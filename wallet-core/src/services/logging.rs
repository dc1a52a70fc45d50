//! Structured mutation logging through `tracing`
//!
//! The engine reports lifecycle events to a [`MutationObserver`]; this is the
//! production observer. Events carry the wallet id, operation and attempt
//! number as fields so JSON output stays queryable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Error, ErrorClass, OperationIntent, Wallet};
use crate::ports::MutationObserver;

/// Surface that submitted the mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Api,
    Cli,
}

impl EntryPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Api => "api",
            EntryPoint::Cli => "cli",
        }
    }
}

/// Emits one `tracing` event per engine lifecycle step
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    entry_point: EntryPoint,
}

impl TracingObserver {
    pub fn new(entry_point: EntryPoint) -> Self {
        Self { entry_point }
    }

    pub fn entry_point(&self) -> EntryPoint {
        self.entry_point
    }
}

impl MutationObserver for TracingObserver {
    fn attempt_started(&self, intent: &OperationIntent, attempt: u32) {
        tracing::debug!(
            entry_point = self.entry_point.as_str(),
            wallet_id = %intent.wallet_id,
            operation = intent.kind.as_str(),
            amount = intent.amount,
            attempt,
            "mutation attempt started"
        );
    }

    fn retry_scheduled(
        &self,
        intent: &OperationIntent,
        attempt: u32,
        delay: Duration,
        cause: &Error,
    ) {
        tracing::warn!(
            entry_point = self.entry_point.as_str(),
            wallet_id = %intent.wallet_id,
            operation = intent.kind.as_str(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            cause = %cause,
            "retrying mutation"
        );
    }

    fn succeeded(&self, intent: &OperationIntent, wallet: &Wallet, attempts: u32) {
        tracing::info!(
            entry_point = self.entry_point.as_str(),
            wallet_id = %intent.wallet_id,
            operation = intent.kind.as_str(),
            amount = intent.amount,
            version = wallet.version,
            attempts,
            "mutation committed"
        );
    }

    fn failed(&self, intent: &OperationIntent, error: &Error, attempts: u32) {
        match error.class() {
            ErrorClass::Input | ErrorClass::Business | ErrorClass::Interrupted => {
                tracing::info!(
                    entry_point = self.entry_point.as_str(),
                    wallet_id = %intent.wallet_id,
                    operation = intent.kind.as_str(),
                    attempts,
                    code = error.code(),
                    "mutation rejected"
                );
            }
            ErrorClass::Contention | ErrorClass::Infrastructure => {
                tracing::error!(
                    entry_point = self.entry_point.as_str(),
                    wallet_id = %intent.wallet_id,
                    operation = intent.kind.as_str(),
                    attempts,
                    code = error.code(),
                    error = %error,
                    "mutation failed"
                );
            }
        }
    }
}
