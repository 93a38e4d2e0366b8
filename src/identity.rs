//! Seeds and public ids.
//!
//! A public id is 60 uppercase letters: four 14-letter groups, each holding one
//! little-endian `u64` of the public key in base 26 (least significant letter first),
//! followed by a 4-letter checksum taken from the low 18 bits of SHA-256(public key).

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::KeyPair;
use crate::error::ExchangeError;

pub const SEED_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
pub const SEED_LENGTH: usize = 55;
pub const PUBLIC_ID_LENGTH: usize = 60;

const GROUP_LETTERS: usize = 14;
const CHECKSUM_LETTERS: usize = 4;
const CHECKSUM_MASK: u32 = 0x3FFFF;

/// Key material derived from a seed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IdentityPackage {
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
    pub public_id: String,
}

impl IdentityPackage {
    pub fn from_seed(seed: &str) -> Result<Self, ExchangeError> {
        let keypair = KeyPair::from_seed(seed)?;
        let public_key = keypair.public_key_bytes();
        Ok(IdentityPackage {
            private_key: keypair.private_key_bytes(),
            public_key,
            public_id: encode_public_id(&public_key),
        })
    }
}

/// Generate a random seed of `length` characters drawn from `alphabet`
pub fn generate_seed(alphabet: &str, length: usize) -> Result<String, ExchangeError> {
    let chars: Vec<char> = alphabet.chars().collect();
    if chars.is_empty() {
        return Err(ExchangeError::InvalidSeed("seed alphabet is empty".to_string()));
    }
    if length == 0 {
        return Err(ExchangeError::InvalidSeed("seed length must be positive".to_string()));
    }
    let mut rng = rand::thread_rng();
    Ok((0..length).map(|_| chars[rng.gen_range(0..chars.len())]).collect())
}

/// Seed with the default alphabet and length
pub fn generate_default_seed() -> String {
    let chars = SEED_ALPHABET.as_bytes();
    let mut rng = rand::thread_rng();
    (0..SEED_LENGTH)
        .map(|_| chars[rng.gen_range(0..chars.len())] as char)
        .collect()
}

pub fn encode_public_id(public_key: &[u8; 32]) -> String {
    let mut id = String::with_capacity(PUBLIC_ID_LENGTH);
    for chunk in public_key.chunks_exact(8) {
        let mut value = u64::from_le_bytes(chunk.try_into().unwrap_or([0u8; 8]));
        for _ in 0..GROUP_LETTERS {
            id.push(letter(value % 26));
            value /= 26;
        }
    }
    let mut checksum = u64::from(checksum(public_key));
    for _ in 0..CHECKSUM_LETTERS {
        id.push(letter(checksum % 26));
        checksum /= 26;
    }
    id
}

/// Recover the public key from a public id, checking length, alphabet and checksum
pub fn decode_public_id(public_id: &str) -> Result<[u8; 32], ExchangeError> {
    let invalid = |reason: &str| ExchangeError::InvalidPublicId(format!("{}: {}", public_id, reason));

    if public_id.len() != PUBLIC_ID_LENGTH {
        return Err(invalid("wrong length"));
    }
    let digits: Vec<u64> = public_id
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' => Ok(u64::from(b - b'A')),
            _ => Err(invalid("non-uppercase character")),
        })
        .collect::<Result<_, _>>()?;

    let mut public_key = [0u8; 32];
    for (group, out) in public_key.chunks_exact_mut(8).enumerate() {
        let letters = &digits[group * GROUP_LETTERS..(group + 1) * GROUP_LETTERS];
        let mut value: u64 = 0;
        for digit in letters.iter().rev() {
            value = value
                .checked_mul(26)
                .and_then(|v| v.checked_add(*digit))
                .ok_or_else(|| invalid("group overflows 64 bits"))?;
        }
        out.copy_from_slice(&value.to_le_bytes());
    }

    let expected = digits[4 * GROUP_LETTERS..]
        .iter()
        .rev()
        .fold(0u64, |acc, d| acc * 26 + d);
    if expected != u64::from(checksum(&public_key)) {
        return Err(invalid("checksum mismatch"));
    }
    Ok(public_key)
}

pub fn is_valid_public_id(public_id: &str) -> bool {
    decode_public_id(public_id).is_ok()
}

fn checksum(public_key: &[u8; 32]) -> u32 {
    let digest = Sha256::digest(public_key);
    u32::from_le_bytes([digest[0], digest[1], digest[2], 0]) & CHECKSUM_MASK
}

fn letter(value: u64) -> char {
    (b'A' + value as u8) as char
}
