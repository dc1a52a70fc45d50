//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case.

pub mod logging;
pub mod migration;
pub mod mutation;
mod wallet;

pub use logging::{EntryPoint, TracingObserver};
pub use migration::{MigrationResult, MigrationService};
pub use mutation::{CallContext, MutationEngine, RetryPolicy};
pub use wallet::WalletService;
