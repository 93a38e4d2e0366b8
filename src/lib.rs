pub mod account;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod network;
pub mod service;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_support;

pub use account::{AccountId, AccountRegistry, AccountSnapshot, OperationOutcome, Rejection};
pub use config::ExchangeConfig;
pub use error::ExchangeError;
pub use network::{NetworkEvent, NetworkSession, SimulatedSession};
pub use service::ExchangeService;
pub use wallet::{LocalWalletFactory, WalletFactory};
