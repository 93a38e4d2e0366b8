use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::{verify_with_pubkey, KeyPair};
use crate::error::ExchangeError;
use crate::identity::{decode_public_id, IdentityPackage};

/// A wallet backing one account (or the hot wallet)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Wallet {
    pub seed: String,
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
    pub public_id: String,
    /// Cached at creation, never refreshed from the network
    pub balance: u64,
}

impl Wallet {
    pub fn from_package(seed: &str, package: IdentityPackage, balance: u64) -> Self {
        Wallet {
            seed: seed.to_string(),
            private_key: package.private_key,
            public_key: package.public_key,
            public_id: package.public_id,
            balance,
        }
    }
}

/// Signed transfer instruction handed to the network session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransactionPayload {
    pub source_public_id: String,
    pub destination_public_id: String,
    pub amount: u64,
    pub tick: u64,
    pub signature_hex: String,
}

#[derive(Serialize)]
struct UnsignedBody<'a> {
    source_public_id: &'a str,
    destination_public_id: &'a str,
    amount: u64,
    tick: u64,
}

impl TransactionPayload {
    /// Bytes covered by the signature
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ExchangeError> {
        signing_bytes(
            &self.source_public_id,
            &self.destination_public_id,
            self.amount,
            self.tick,
        )
    }

    /// Check the signature against the key encoded in `source_public_id`
    pub fn verify(&self) -> bool {
        let Ok(pubkey) = decode_public_id(&self.source_public_id) else {
            return false;
        };
        match self.signing_bytes() {
            Ok(message) => verify_with_pubkey(&message, &self.signature_hex, &pubkey),
            Err(_) => false,
        }
    }
}

fn signing_bytes(
    source_public_id: &str,
    destination_public_id: &str,
    amount: u64,
    tick: u64,
) -> Result<Vec<u8>, ExchangeError> {
    let body = UnsignedBody {
        source_public_id,
        destination_public_id,
        amount,
        tick,
    };
    Ok(bincode::serialize(&body)?)
}

/// Identity derivation and payload construction
#[async_trait]
pub trait WalletFactory: Send + Sync {
    async fn create_identity(&self, seed: &str) -> Result<IdentityPackage, ExchangeError>;

    async fn create_transaction(
        &self,
        source_seed: &str,
        destination_public_id: &str,
        amount: u64,
        tick: u64,
    ) -> Result<TransactionPayload, ExchangeError>;
}

/// In-process factory: ed25519 keys from seeds, signed payloads
#[derive(Debug, Default, Clone)]
pub struct LocalWalletFactory;

impl LocalWalletFactory {
    pub fn new() -> Self {
        LocalWalletFactory
    }
}

#[async_trait]
impl WalletFactory for LocalWalletFactory {
    async fn create_identity(&self, seed: &str) -> Result<IdentityPackage, ExchangeError> {
        IdentityPackage::from_seed(seed)
    }

    async fn create_transaction(
        &self,
        source_seed: &str,
        destination_public_id: &str,
        amount: u64,
        tick: u64,
    ) -> Result<TransactionPayload, ExchangeError> {
        decode_public_id(destination_public_id)?;

        let package = IdentityPackage::from_seed(source_seed)?;
        let keypair = KeyPair::from_seed(source_seed)?;
        let message = signing_bytes(&package.public_id, destination_public_id, amount, tick)?;

        Ok(TransactionPayload {
            source_public_id: package.public_id,
            destination_public_id: destination_public_id.to_string(),
            amount,
            tick,
            signature_hex: keypair.sign_hex(&message),
        })
    }
}
