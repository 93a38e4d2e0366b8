//! Account, transaction record and outcome types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::wallet::Wallet;

/// Sequential account identifier, starting at 1
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub u32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(AccountId)
            .map_err(|_| format!("Invalid account id: {}", s))
    }
}

/// Simulated participant. Only the registry holds these.
#[derive(Clone, Debug)]
pub(crate) struct Account {
    pub id: AccountId,
    pub wallet: Wallet,
    pub balance: u64,
    pub locked: bool,
}

impl Account {
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            public_id: self.wallet.public_id.clone(),
            balance: self.balance,
            wallet_balance: self.wallet.balance,
            locked: self.locked,
        }
    }
}

/// Read-only view handed to consumers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub public_id: String,
    pub balance: u64,
    pub wallet_balance: u64,
    pub locked: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionKind {
    Withdraw,
    Transfer,
    Deposit,
}

/// Either side of a transaction
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Party {
    Account(AccountId),
    External,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Account(id) => write!(f, "{}", id),
            Party::External => write!(f, "External"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    pub amount: u64,
    pub from: Party,
    pub to: Party,
    /// Set for withdrawals
    pub destination_public_id: Option<String>,
    pub tick: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Why an operation was refused before anything was submitted
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    UnknownAccount(AccountId),
    InvalidAmount,
    SameAccount,
    AccountLocked(AccountId),
    InsufficientFunds {
        account: AccountId,
        available: u64,
        requested: u64,
    },
    BalanceOverflow(AccountId),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnknownAccount(id) => write!(f, "unknown account {}", id),
            Rejection::InvalidAmount => write!(f, "amount must be positive"),
            Rejection::SameAccount => write!(f, "sender and receiver are the same account"),
            Rejection::AccountLocked(id) => write!(f, "account {} is locked", id),
            Rejection::InsufficientFunds {
                account,
                available,
                requested,
            } => write!(
                f,
                "insufficient funds in account {}: available {}, requested {}",
                account, available, requested
            ),
            Rejection::BalanceOverflow(id) => write!(f, "balance of account {} would overflow", id),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// The session returned a false indicator
    Refused,
    /// Payload construction or submission raised an error
    Error(String),
}

impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionFailure::Refused => write!(f, "network refused the package"),
            SubmissionFailure::Error(msg) => write!(f, "submission error: {}", msg),
        }
    }
}

/// Result of every mutating registry operation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum OperationOutcome {
    Completed(TransactionRecord),
    Rejected(Rejection),
    SubmissionFailed(SubmissionFailure),
}

impl OperationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, OperationOutcome::Completed(_))
    }

    pub fn record(&self) -> Option<&TransactionRecord> {
        match self {
            OperationOutcome::Completed(record) => Some(record),
            _ => None,
        }
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationOutcome::Completed(record) => write!(
                f,
                "{:?} of {} from {} to {} completed at tick {}",
                record.kind, record.amount, record.from, record.to, record.tick
            ),
            OperationOutcome::Rejected(reason) => write!(f, "rejected: {}", reason),
            OperationOutcome::SubmissionFailed(failure) => write!(f, "failed: {}", failure),
        }
    }
}
