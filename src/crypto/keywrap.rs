//! Password-based wrapping of file keys and small metadata records.
//!
//! Envelope layout, base64 encoded: `salt (16) || nonce (12) || AES-256-GCM ciphertext`.
//! The wrapping key is PBKDF2-HMAC-SHA256 over the password and salt. Nothing in
//! here is called by the server-side storage paths; they only ever store the
//! resulting strings.

use base64::prelude::*;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::num::NonZeroU32;

use super::encryption::{open, seal, KEY_LEN, NONCE_LEN};
use crate::{Result, StorageError};

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const SALT_LEN: usize = 16;

const ITERATIONS: NonZeroU32 = match NonZeroU32::new(PBKDF2_ITERATIONS) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

/// Sensitive per-file details the client wraps before upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientMetadata {
    pub name: String,
    pub size: u64,
}

pub fn derive_master_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        ITERATIONS,
        salt,
        password.as_bytes(),
        &mut key,
    );
    key
}

pub fn wrap_key(file_key: &[u8], password: &str, salt: Option<[u8; SALT_LEN]>) -> Result<String> {
    wrap_bytes(file_key, password, salt)
}

pub fn unwrap_key(wrapped: &str, password: &str) -> Result<Vec<u8>> {
    unwrap_bytes(wrapped, password)
}

pub fn wrap_metadata<T: Serialize>(
    metadata: &T,
    password: &str,
    salt: Option<[u8; SALT_LEN]>,
) -> Result<String> {
    let json = serde_json::to_vec(metadata)?;
    wrap_bytes(&json, password, salt)
}

pub fn unwrap_metadata<T: DeserializeOwned>(wrapped: &str, password: &str) -> Result<T> {
    let json = unwrap_bytes(wrapped, password)?;
    serde_json::from_slice(&json).map_err(|_| StorageError::WrongPasswordOrCorruptData)
}

/// Hex SHA-256 of plaintext, for clients to attach as an advisory integrity hash.
pub fn integrity_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn verify_integrity(data: &[u8], expected: &str) -> Result<()> {
    let actual = integrity_hash(data);
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(StorageError::Integrity(format!(
            "plaintext hash {} does not match expected {}",
            &actual[..16],
            expected.get(..16).unwrap_or(expected)
        )));
    }
    Ok(())
}

fn random_bytes<const N: usize>(rng: &SystemRandom) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    rng.fill(&mut buf)
        .map_err(|_| StorageError::Storage("system random source unavailable".into()))?;
    Ok(buf)
}

fn wrap_bytes(secret: &[u8], password: &str, salt: Option<[u8; SALT_LEN]>) -> Result<String> {
    let rng = SystemRandom::new();
    let salt = match salt {
        Some(salt) => salt,
        None => random_bytes::<SALT_LEN>(&rng)?,
    };
    let nonce = random_bytes::<NONCE_LEN>(&rng)?;

    let master_key = derive_master_key(password, &salt);
    let ciphertext = seal(&master_key, &nonce, secret)?;

    let mut envelope = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(BASE64_STANDARD.encode(envelope))
}

fn unwrap_bytes(wrapped: &str, password: &str) -> Result<Vec<u8>> {
    let envelope = BASE64_STANDARD
        .decode(wrapped.trim())
        .map_err(|_| StorageError::WrongPasswordOrCorruptData)?;
    if envelope.len() < SALT_LEN + NONCE_LEN {
        return Err(StorageError::WrongPasswordOrCorruptData);
    }

    let (salt, rest) = envelope.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let master_key = derive_master_key(password, salt);

    open(&master_key, nonce, ciphertext).map_err(|_| StorageError::WrongPasswordOrCorruptData)
}
