//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod operation;
pub mod result;
mod wallet;

pub use operation::{validate, OperationIntent, OperationKind, OperationRequest};
pub use result::{Error, ErrorClass, Result};
pub use wallet::{Wallet, INITIAL_VERSION};
