//! Wallet domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version stamp assigned to a freshly created wallet
pub const INITIAL_VERSION: i64 = 1;

/// A balance holder mutated only through versioned conditional updates.
///
/// `balance` is in minor units and never negative. `version` starts at
/// [`INITIAL_VERSION`] and grows by exactly one per committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Wallet {
    /// Create an empty wallet at its initial version
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            balance: 0,
            created_at: now,
            updated_at: now,
            version: INITIAL_VERSION,
        }
    }
}
