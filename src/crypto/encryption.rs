use aes_gcm::{aead::Aead, Aes256Gcm, Key, KeyInit, Nonce};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use crate::{Result, StorageError};

pub const ALGORITHM: &str = "AES-256-GCM";
pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
/// Hex characters of the ciphertext digest kept as the file id.
pub const FILE_ID_LEN: usize = 16;

/// Output of a whole-file encryption. The key and nonce are fresh per call.
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub key: [u8; KEY_LEN],
    pub nonce: [u8; NONCE_LEN],
}

#[derive(Clone)]
pub struct EncryptionEngine {
    rng: SystemRandom,
}

impl Default for EncryptionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionEngine {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Sealed> {
        let mut key = [0u8; KEY_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        self.fill(&mut key)?;
        self.fill(&mut nonce)?;

        let ciphertext = seal(&key, &nonce, plaintext)?;
        Ok(Sealed { ciphertext, key, nonce })
    }

    pub fn decrypt(&self, ciphertext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        open(key, nonce, ciphertext)
    }

    pub(crate) fn fill(&self, buf: &mut [u8]) -> Result<()> {
        self.rng
            .fill(buf)
            .map_err(|_| StorageError::Storage("system random source unavailable".into()))
    }
}

fn check_lengths(key: &[u8], nonce: &[u8]) -> Result<()> {
    if key.len() != KEY_LEN {
        return Err(StorageError::InvalidArgument(format!(
            "key must be {} bytes, got {}",
            KEY_LEN,
            key.len()
        )));
    }
    if nonce.len() != NONCE_LEN {
        return Err(StorageError::InvalidArgument(format!(
            "nonce must be {} bytes, got {}",
            NONCE_LEN,
            nonce.len()
        )));
    }
    Ok(())
}

pub(crate) fn seal(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    check_lengths(key, nonce)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|err| StorageError::Storage(format!("Encryption error: {}", err)))
}

pub(crate) fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    check_lengths(key, nonce)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| StorageError::Authentication)
}

/// Content-derived id: the first 16 hex characters of SHA-256(ciphertext).
pub fn file_id(ciphertext: &[u8]) -> String {
    let digest = Sha256::digest(ciphertext);
    hex::encode(digest)[..FILE_ID_LEN].to_string()
}

/// Re-derives the id from loaded ciphertext and fails closed on a mismatch.
pub fn verify_file_id(ciphertext: &[u8], expected: &str) -> Result<()> {
    let actual = file_id(ciphertext);
    if actual != expected {
        return Err(StorageError::Integrity(format!(
            "ciphertext hashes to {} but record is {}",
            actual, expected
        )));
    }
    Ok(())
}
