//! Deposit/withdraw intents and the validation that guards the engine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};
use super::wallet::Wallet;

/// Kind of balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "DEPOSIT",
            OperationKind::Withdraw => "WITHDRAW",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    /// Wire names are matched exactly; `"deposit"` is not a valid kind.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DEPOSIT" => Ok(OperationKind::Deposit),
            "WITHDRAW" => Ok(OperationKind::Withdraw),
            other => Err(Error::InvalidOperationKind(other.to_string())),
        }
    }
}

/// Operation payload as received from a caller, not yet validated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub wallet_id: Uuid,
    pub operation_type: String,
    pub amount: i64,
}

impl OperationRequest {
    pub fn new(wallet_id: Uuid, operation_type: impl Into<String>, amount: i64) -> Self {
        Self {
            wallet_id,
            operation_type: operation_type.into(),
            amount,
        }
    }
}

/// A validated mutation intent. Only [`validate`] produces one from
/// untrusted input, so `amount` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationIntent {
    pub wallet_id: Uuid,
    pub kind: OperationKind,
    pub amount: i64,
}

impl OperationIntent {
    pub fn deposit(wallet_id: Uuid, amount: i64) -> Result<Self> {
        Self::checked(wallet_id, OperationKind::Deposit, amount)
    }

    pub fn withdraw(wallet_id: Uuid, amount: i64) -> Result<Self> {
        Self::checked(wallet_id, OperationKind::Withdraw, amount)
    }

    fn checked(wallet_id: Uuid, kind: OperationKind, amount: i64) -> Result<Self> {
        if amount <= 0 {
            return Err(Error::InvalidAmount(amount));
        }
        Ok(Self { wallet_id, kind, amount })
    }

    /// Balance the wallet would hold after applying this intent.
    ///
    /// Withdrawals never take the balance below zero and deposits never wrap.
    pub fn next_balance(&self, wallet: &Wallet) -> Result<i64> {
        match self.kind {
            OperationKind::Withdraw => {
                if wallet.balance < self.amount {
                    return Err(Error::InsufficientFunds {
                        wallet_id: wallet.id,
                        balance: wallet.balance,
                        amount: self.amount,
                    });
                }
                Ok(wallet.balance - self.amount)
            }
            OperationKind::Deposit => {
                wallet
                    .balance
                    .checked_add(self.amount)
                    .ok_or(Error::AmountOverflow {
                        wallet_id: wallet.id,
                        balance: wallet.balance,
                        amount: self.amount,
                    })
            }
        }
    }
}

/// Validate a raw operation before any store access.
///
/// The amount is checked before the kind, so a request that is wrong on both
/// counts reports `InvalidAmount`.
pub fn validate(request: &OperationRequest) -> Result<OperationIntent> {
    if request.amount <= 0 {
        return Err(Error::InvalidAmount(request.amount));
    }
    let kind = request.operation_type.parse::<OperationKind>()?;
    Ok(OperationIntent {
        wallet_id: request.wallet_id,
        kind,
        amount: request.amount,
    })
}
