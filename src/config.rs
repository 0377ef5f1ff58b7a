use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, StorageError};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_BATCH_WIDTH: usize = 4;
pub const DEFAULT_RECORD_CACHE_SIZE: usize = 128;

/// Settings for one drive. The caller hands in a per-user `root`; everything
/// the store writes lives underneath it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub chunk_size: usize,
    pub batch_width: usize,
    pub record_cache_size: usize,
    /// Records whose name ends with this suffix are left out of listings.
    /// Off unless set.
    pub legacy_hidden_suffix: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_width: DEFAULT_BATCH_WIDTH,
            record_cache_size: DEFAULT_RECORD_CACHE_SIZE,
            legacy_hidden_suffix: None,
        }
    }
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_owned(),
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_batch_width(mut self, batch_width: usize) -> Self {
        self.batch_width = batch_width;
        self
    }

    pub fn with_record_cache(mut self, record_cache_size: usize) -> Self {
        self.record_cache_size = record_cache_size;
        self
    }

    /// Loads a JSON config file. Missing fields fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: StoreConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(StorageError::InvalidArgument("chunk_size must be greater than zero".into()));
        }
        if self.batch_width == 0 {
            return Err(StorageError::InvalidArgument("batch_width must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    pub fn folders_dir(&self) -> PathBuf {
        self.root.join("folders")
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }
}
