use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{ChunkRecord, LoadedChunk, Result, StorageError};

pub use crate::config::DEFAULT_CHUNK_SIZE;

const CHUNK_EXTENSION: &str = "enc";

/// Fixed-size, hash-verified chunk files for ciphertext.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    chunks_path: PathBuf,
    chunk_size: usize,
}

impl ChunkStore {
    pub async fn new<P: AsRef<Path>>(chunks_path: P, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(StorageError::InvalidArgument("chunk size must be greater than zero".into()));
        }
        let chunks_path = chunks_path.as_ref().to_owned();
        fs::create_dir_all(&chunks_path).await?;

        Ok(Self { chunks_path, chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_name(file_id: &str, index: u32) -> String {
        format!("{}_chunk_{:04}.{}", file_id, index, CHUNK_EXTENSION)
    }

    fn chunk_path(&self, location: &str) -> Result<PathBuf> {
        if location.is_empty() || location.contains(|c: char| c == '/' || c == '\\') || location == ".." {
            return Err(StorageError::Integrity(format!("invalid chunk location: {}", location)));
        }
        Ok(self.chunks_path.join(location))
    }

    /// Slices `ciphertext` and writes each slice under a name unique to
    /// `(file_id, index)`.
    pub async fn split(&self, ciphertext: &[u8], file_id: &str) -> Result<Vec<ChunkRecord>> {
        let mut records = Vec::new();

        for (index, data) in ciphertext.chunks(self.chunk_size).enumerate() {
            let index = index as u32;
            let hash = checksum(data);
            let location = Self::chunk_name(file_id, index);

            fs::write(self.chunk_path(&location)?, data).await?;
            debug!(file_id, index, size = data.len(), "chunk written");

            records.push(ChunkRecord {
                chunk_id: hash[..16].to_string(),
                hash,
                size: data.len() as u64,
                index,
                location,
            });
        }

        info!(file_id, chunks = records.len(), "ciphertext split into chunks");
        Ok(records)
    }

    /// Reads every referenced chunk and checks it against its recorded hash.
    pub async fn load(&self, refs: &[ChunkRecord]) -> Result<Vec<LoadedChunk>> {
        let mut loaded = Vec::with_capacity(refs.len());

        for chunk in refs {
            let path = self.chunk_path(&chunk.location)?;
            let data = match fs::read(&path).await {
                Ok(data) => data,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(StorageError::Integrity(format!("chunk {} is missing", chunk.location)));
                }
                Err(e) => return Err(e.into()),
            };

            if checksum(&data) != chunk.hash {
                return Err(StorageError::Integrity(format!("chunk {} is corrupt", chunk.location)));
            }
            loaded.push(LoadedChunk { index: chunk.index, data });
        }

        Ok(loaded)
    }

    /// Concatenates chunks in index order, whatever order they arrive in.
    pub fn reassemble(mut chunks: Vec<LoadedChunk>) -> Vec<u8> {
        chunks.sort_by_key(|c| c.index);
        let total = chunks.iter().map(|c| c.data.len()).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend(chunk.data);
        }
        data
    }

    /// Best-effort removal. Chunks that are already gone are skipped.
    pub async fn delete(&self, refs: &[ChunkRecord]) {
        for chunk in refs {
            if let Err(e) = self.remove(&chunk.location).await {
                warn!(chunk = %chunk.location, error = %e, "failed to delete chunk");
            }
        }
    }

    /// Removes one chunk file by name. Returns false when it did not exist.
    pub async fn remove(&self, location: &str) -> Result<bool> {
        match fs::remove_file(self.chunk_path(location)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// File names of every chunk currently on disk.
    pub async fn stored_chunks(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.chunks_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(CHUNK_EXTENSION) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}

fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
