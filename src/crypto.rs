use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::ExchangeError;

/// Ed25519 key pair derived from a wallet seed
pub struct KeyPair {
    pub signing_key: SigningKey,
}

impl KeyPair {
    /// Derive the key pair for a seed string.
    /// The secret is SHA-256 of the seed bytes, so the same seed always yields the same keys.
    pub fn from_seed(seed: &str) -> Result<Self, ExchangeError> {
        if seed.is_empty() {
            return Err(ExchangeError::InvalidSeed("seed is empty".to_string()));
        }
        let secret: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
        Ok(KeyPair {
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    /// Sign a message with the private key
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.signing_key.verifying_key().verify(message, signature).is_ok()
    }

    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message and return hex string
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.sign(message).to_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }
}

/// Verify a hex signature against a message with raw public key bytes
pub fn verify_with_pubkey(message: &[u8], signature_hex: &str, pubkey: &[u8; 32]) -> bool {
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(pubkey) else {
        return false;
    };
    verifying_key
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .is_ok()
}
