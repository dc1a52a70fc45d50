//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod observer;
mod store;

pub use observer::{MutationObserver, NoopObserver};
pub use store::BalanceStore;
