use serde::{Deserialize, Serialize};

/// Reference to one stored slice of a file's ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub hash: String,
    pub size: u64,
    pub index: u32,
    /// Chunk file name, relative to the chunk root.
    pub location: String,
}

/// Chunk bytes read back from disk after their hash was checked.
#[derive(Debug, Clone)]
pub struct LoadedChunk {
    pub index: u32,
    pub data: Vec<u8>,
}
