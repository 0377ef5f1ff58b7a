use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::catalog::MetadataCatalog;
use crate::chunk::ChunkStore;
use crate::crypto::verify_file_id;
use crate::{FileRecord, Result, StorageError};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub removed: Vec<String>,
}

/// At-rest checks that need no key material.
pub struct ValidationManager {
    chunks: ChunkStore,
    catalog: MetadataCatalog,
}

impl ValidationManager {
    pub fn new(chunks: ChunkStore, catalog: MetadataCatalog) -> Self {
        Self { chunks, catalog }
    }

    /// Loads and re-hashes every chunk of a record, then checks the
    /// reassembled ciphertext still hashes to the file id.
    pub async fn validate_file(&self, record: &FileRecord) -> Result<()> {
        let total_size: u64 = record.chunks.iter().map(|c| c.size).sum();
        if total_size != record.encrypted_size {
            return Err(StorageError::Integrity(format!(
                "File size mismatch. Expected: {}, Got: {}",
                record.encrypted_size, total_size
            )));
        }

        let mut indices: Vec<u32> = record.chunks.iter().map(|c| c.index).collect();
        indices.sort_unstable();
        if indices.iter().enumerate().any(|(pos, &index)| pos as u32 != index) {
            return Err(StorageError::Integrity(format!(
                "chunk indices of {} are not contiguous",
                record.file_id
            )));
        }

        let loaded = self.chunks.load(&record.chunks).await?;
        let ciphertext = ChunkStore::reassemble(loaded);
        verify_file_id(&ciphertext, &record.file_id)
    }

    /// Deletes chunk files that no record references. Safe to run repeatedly,
    /// but not while uploads are in progress: their chunks land before their
    /// record does.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let referenced: HashSet<String> = self
            .catalog
            .all_records()
            .await?
            .into_iter()
            .flat_map(|record| record.chunks.into_iter().map(|c| c.location))
            .collect();

        let stored = self.chunks.stored_chunks().await?;
        let mut report = ReconcileReport {
            scanned: stored.len(),
            removed: Vec::new(),
        };

        for name in stored {
            if referenced.contains(&name) {
                continue;
            }
            match self.chunks.remove(&name).await {
                Ok(_) => report.removed.push(name),
                Err(e) => warn!(chunk = %name, error = %e, "failed to delete orphaned chunk"),
            }
        }

        info!(scanned = report.scanned, removed = report.removed.len(), "reconciliation finished");
        Ok(report)
    }
}
