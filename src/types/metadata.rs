use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ChunkRecord;

/// Name shown for files whose real name only the client can recover.
pub const ENCRYPTED_NAME_PLACEHOLDER: &str = "[encrypted]";

/// Key for a file. Server-side files keep the raw key; zero-knowledge files
/// only ever have the client's wrapped key on record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyMaterial {
    Raw { key: String },
    Wrapped { wrapped_key: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptionParams {
    pub algorithm: String,
    pub key: KeyMaterial,
    /// Hex for server-side files, stored verbatim as supplied by the client
    /// otherwise.
    pub nonce: String,
    pub key_size_bits: u32,
    pub nonce_size_bits: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub original_name: String,
    pub original_size: u64,
    pub encrypted_size: u64,
    pub encryption: EncryptionParams,
    pub chunks: Vec<ChunkRecord>,
    pub folder_path: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub integrity_hash: Option<String>,
    #[serde(default)]
    pub wrapped_metadata: Option<String>,
    #[serde(default)]
    pub client_encrypted: bool,
}

impl FileRecord {
    pub fn display_name(&self) -> &str {
        if self.client_encrypted {
            ENCRYPTED_NAME_PLACEHOLDER
        } else {
            &self.original_name
        }
    }

    pub fn listing(&self) -> FileListing {
        FileListing {
            file_id: self.file_id.clone(),
            original_name: self.display_name().to_string(),
            file_size: self.original_size,
            chunk_count: self.chunks.len(),
            upload_date: self.created_at,
            folder_path: self.folder_path.clone(),
            client_encrypted: self.client_encrypted,
        }
    }

    pub fn info(&self) -> FileInfo {
        FileInfo {
            file_id: self.file_id.clone(),
            name: self.display_name().to_string(),
            size: self.original_size,
            encrypted_size: self.encrypted_size,
            algorithm: self.encryption.algorithm.clone(),
            chunks: self.chunks.len(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileListing {
    pub file_id: String,
    pub original_name: String,
    pub file_size: u64,
    pub chunk_count: usize,
    pub upload_date: DateTime<Utc>,
    pub folder_path: String,
    pub client_encrypted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    pub file_id: String,
    pub name: String,
    pub size: u64,
    pub encrypted_size: u64,
    pub algorithm: String,
    pub chunks: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptSummary {
    pub file_id: String,
    pub original_name: String,
    pub chunk_count: usize,
    pub folder_path: String,
}

/// Everything a client sends alongside its ciphertext in zero-knowledge mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientUpload {
    pub wrapped_key: String,
    pub nonce: String,
    pub integrity_hash: Option<String>,
    pub wrapped_metadata: Option<String>,
    pub original_size: u64,
    pub folder_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSaveSummary {
    pub file_id: String,
    pub folder_path: String,
}

/// Raw ciphertext plus the wrapped material a client needs to open it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEncryptedPayload {
    pub file_id: String,
    #[serde(skip)]
    pub ciphertext: Vec<u8>,
    pub wrapped_key: String,
    pub nonce: String,
    pub integrity_hash: Option<String>,
    pub wrapped_metadata: Option<String>,
    pub original_size: u64,
    pub folder_path: String,
}
