//! Account bookkeeping for the simulated exchange
//!
//! This module implements:
//! - Sequentially numbered accounts, one wallet each
//! - Withdraw / transfer / deposit with sufficiency and lock checks
//! - Tagged outcomes instead of thrown errors

pub mod types;
pub mod balance;
pub mod registry;

pub use types::{
    AccountId, AccountSnapshot, OperationOutcome, Party, Rejection, SubmissionFailure,
    TransactionKind, TransactionRecord,
};
pub use balance::BalanceError;
pub use registry::AccountRegistry;
