use std::sync::Arc;
use tracing::{debug, info};

use super::cache::RecordCache;
use super::store::RecordStore;
use crate::path;
use crate::{FileInfo, FileListing, FileRecord, Result, StorageError};

/// File records keyed by file id, filterable by folder path.
#[derive(Clone)]
pub struct MetadataCatalog {
    store: Arc<dyn RecordStore<FileRecord>>,
    cache: Option<RecordCache<FileRecord>>,
    hidden_suffix: Option<String>,
}

impl MetadataCatalog {
    pub fn new(store: Arc<dyn RecordStore<FileRecord>>) -> Self {
        Self {
            store,
            cache: None,
            hidden_suffix: None,
        }
    }

    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = RecordCache::new(capacity);
        self
    }

    pub fn with_hidden_suffix(mut self, suffix: Option<String>) -> Self {
        self.hidden_suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    pub async fn put(&self, record: &FileRecord) -> Result<()> {
        self.store.put(&record.file_id, record).await?;
        if let Some(cache) = &self.cache {
            cache.put(&record.file_id, record.clone()).await;
        }
        debug!(file_id = %record.file_id, "file record stored");
        Ok(())
    }

    pub async fn get(&self, file_id: &str) -> Result<FileRecord> {
        if let Some(cache) = &self.cache {
            if let Some(record) = cache.get(file_id).await {
                return Ok(record);
            }
        }

        let record = self
            .store
            .get(file_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("file {}", file_id)))?;

        if let Some(cache) = &self.cache {
            cache.put(file_id, record.clone()).await;
        }
        Ok(record)
    }

    pub async fn file_info(&self, file_id: &str) -> Result<FileInfo> {
        Ok(self.get(file_id).await?.info())
    }

    /// Changes only the folder placement of a record.
    pub async fn update_folder_path(&self, file_id: &str, new_folder_path: &str) -> Result<FileRecord> {
        let new_folder_path = path::normalize(new_folder_path)?;
        let mut record = self.get(file_id).await?;
        record.folder_path = new_folder_path;
        self.put(&record).await?;

        info!(file_id, folder = %record.folder_path, "file moved");
        Ok(record)
    }

    pub async fn delete(&self, file_id: &str) -> Result<bool> {
        if let Some(cache) = &self.cache {
            cache.invalidate(file_id).await;
        }
        let removed = self.store.delete(file_id).await?;
        debug!(file_id, removed, "file record deleted");
        Ok(removed)
    }

    fn is_hidden(&self, record: &FileRecord) -> bool {
        match &self.hidden_suffix {
            Some(suffix) => !record.client_encrypted && record.original_name.ends_with(suffix.as_str()),
            None => false,
        }
    }

    /// Full records placed directly in `folder_path`.
    pub async fn records_in(&self, folder_path: &str) -> Result<Vec<FileRecord>> {
        let wanted = path::normalize(folder_path)?;
        let filter = move |record: &FileRecord| {
            path::normalize(&record.folder_path).map_or(false, |stored| stored == wanted)
        };
        let mut records = self.store.scan(&filter).await?;
        sort_records(&mut records);
        Ok(records)
    }

    pub async fn all_records(&self) -> Result<Vec<FileRecord>> {
        let mut records = self.store.scan(&|_: &FileRecord| true).await?;
        sort_records(&mut records);
        Ok(records)
    }

    pub async fn list(&self, folder_path: &str) -> Result<Vec<FileListing>> {
        let records = self.records_in(folder_path).await?;
        Ok(self.listings(records))
    }

    pub async fn list_all(&self) -> Result<Vec<FileListing>> {
        let records = self.all_records().await?;
        Ok(self.listings(records))
    }

    fn listings(&self, records: Vec<FileRecord>) -> Vec<FileListing> {
        records
            .iter()
            .filter(|r| !self.is_hidden(r))
            .map(FileRecord::listing)
            .collect()
    }
}

fn sort_records(records: &mut [FileRecord]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.file_id.cmp(&b.file_id))
    });
}
