//! Client side of zero-knowledge mode.
//!
//! These run where the password lives. They produce what
//! [`DriveStorage::save_client_encrypted_file`](crate::storage::DriveStorage::save_client_encrypted_file)
//! accepts and open what
//! [`DriveStorage::read_client_encrypted_file`](crate::storage::DriveStorage::read_client_encrypted_file)
//! returns.

use base64::prelude::*;

use crate::crypto::{
    integrity_hash, unwrap_key, unwrap_metadata, verify_integrity, wrap_key, wrap_metadata,
    ClientMetadata, EncryptionEngine,
};
use crate::{ClientEncryptedPayload, ClientUpload, Result, StorageError};

pub struct ClientSealed {
    pub ciphertext: Vec<u8>,
    pub upload: ClientUpload,
}

pub fn seal_for_upload(
    plaintext: &[u8],
    name: &str,
    folder_path: &str,
    password: &str,
) -> Result<ClientSealed> {
    let sealed = EncryptionEngine::new().encrypt(plaintext)?;
    let metadata = ClientMetadata {
        name: name.to_string(),
        size: plaintext.len() as u64,
    };

    let upload = ClientUpload {
        wrapped_key: wrap_key(&sealed.key, password, None)?,
        nonce: BASE64_STANDARD.encode(sealed.nonce),
        integrity_hash: Some(integrity_hash(plaintext)),
        wrapped_metadata: Some(wrap_metadata(&metadata, password, None)?),
        original_size: metadata.size,
        folder_path: folder_path.to_string(),
    };

    Ok(ClientSealed {
        ciphertext: sealed.ciphertext,
        upload,
    })
}

pub fn open_download(payload: &ClientEncryptedPayload, password: &str) -> Result<(ClientMetadata, Vec<u8>)> {
    let key = unwrap_key(&payload.wrapped_key, password)?;
    let nonce = BASE64_STANDARD
        .decode(payload.nonce.trim())
        .map_err(|_| StorageError::WrongPasswordOrCorruptData)?;

    let plaintext = EncryptionEngine::new().decrypt(&payload.ciphertext, &key, &nonce)?;
    if let Some(expected) = &payload.integrity_hash {
        verify_integrity(&plaintext, expected)?;
    }

    let metadata = match &payload.wrapped_metadata {
        Some(wrapped) => unwrap_metadata(wrapped, password)?,
        None => ClientMetadata {
            name: payload.file_id.clone(),
            size: payload.original_size,
        },
    };
    Ok((metadata, plaintext))
}
