//! Scriptable collaborators for registry and service tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

use crate::account::AccountRegistry;
use crate::config::AccountsConfig;
use crate::error::ExchangeError;
use crate::identity::IdentityPackage;
use crate::network::{NetworkEvent, NetworkSession};
use crate::wallet::{TransactionPayload, WalletFactory};

/// (source_seed, destination, amount, tick)
pub type TransactionCall = (String, String, u64, u64);

#[derive(Default)]
pub struct MockFactory {
    pub fail_identity: AtomicBool,
    pub fail_transaction: AtomicBool,
    pub transactions: Mutex<Vec<TransactionCall>>,
}

impl MockFactory {
    pub fn calls(&self) -> Vec<TransactionCall> {
        self.transactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletFactory for MockFactory {
    async fn create_identity(&self, seed: &str) -> Result<IdentityPackage, ExchangeError> {
        if self.fail_identity.load(Ordering::SeqCst) {
            return Err(ExchangeError::InvalidSeed(seed.to_string()));
        }
        IdentityPackage::from_seed(seed)
    }

    async fn create_transaction(
        &self,
        source_seed: &str,
        destination_public_id: &str,
        amount: u64,
        tick: u64,
    ) -> Result<TransactionPayload, ExchangeError> {
        self.transactions.lock().unwrap().push((
            source_seed.to_string(),
            destination_public_id.to_string(),
            amount,
            tick,
        ));
        if self.fail_transaction.load(Ordering::SeqCst) {
            return Err(ExchangeError::Signing("helper unavailable".to_string()));
        }
        Ok(TransactionPayload {
            source_public_id: format!("src:{}", source_seed),
            destination_public_id: destination_public_id.to_string(),
            amount,
            tick,
            signature_hex: "transaction-payload".to_string(),
        })
    }
}

pub struct MockSession {
    pub accept: AtomicBool,
    pub raise: AtomicBool,
    pub sent: Mutex<Vec<TransactionPayload>>,
    pub balance_requests: Mutex<Vec<String>>,
    pub started: AtomicBool,
}

impl Default for MockSession {
    fn default() -> Self {
        MockSession {
            accept: AtomicBool::new(true),
            raise: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            balance_requests: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }
}

impl MockSession {
    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<TransactionPayload> {
        self.sent.lock().unwrap().clone()
    }

    pub fn balance_requests(&self) -> Vec<String> {
        self.balance_requests.lock().unwrap().clone()
    }
}

impl NetworkSession for MockSession {
    fn start(&self, _events: UnboundedSender<NetworkEvent>) -> Result<(), ExchangeError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn request_balance(&self, public_id: &str) {
        self.balance_requests.lock().unwrap().push(public_id.to_string());
    }

    fn send_package(&self, payload: &TransactionPayload) -> Result<bool, ExchangeError> {
        if self.raise.load(Ordering::SeqCst) {
            return Err(ExchangeError::Network("socket closed".to_string()));
        }
        self.sent.lock().unwrap().push(payload.clone());
        Ok(self.accept.load(Ordering::SeqCst))
    }

    fn peer(&self) -> &str {
        "mock-peer"
    }
}

pub fn mock_registry() -> (Arc<AccountRegistry>, Arc<MockFactory>, Arc<MockSession>) {
    let factory = Arc::new(MockFactory::default());
    let session = Arc::new(MockSession::default());
    let registry = Arc::new(AccountRegistry::new(
        factory.clone(),
        session.clone(),
        AccountsConfig::default(),
    ));
    (registry, factory, session)
}
