use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::warn;

use crate::atomic::write_atomically_async;
use crate::{Result, StorageError};

pub type RecordFilter<'a, R> = &'a (dyn Fn(&R) -> bool + Send + Sync);

/// Key-value persistence for catalog records.
#[async_trait]
pub trait RecordStore<R: Send + Sync + 'static>: Send + Sync {
    async fn put(&self, key: &str, record: &R) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<R>>;
    /// Returns false when there was nothing to delete.
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn scan(&self, filter: RecordFilter<'_, R>) -> Result<Vec<R>>;
}

/// Keys become file names, so only a conservative alphabet is accepted.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(StorageError::InvalidArgument(format!("invalid record key: {:?}", key)));
    }
    Ok(())
}

/// One pretty-printed JSON document per key in a single directory.
pub struct JsonDirStore<R> {
    dir: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R> JsonDirStore<R> {
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_owned();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            _record: PhantomData,
        })
    }

    fn record_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl<R> RecordStore<R> for JsonDirStore<R>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn put(&self, key: &str, record: &R) -> Result<()> {
        let path = self.record_path(key)?;
        let json = serde_json::to_vec_pretty(record)?;

        // readers never see a half-written record
        write_atomically_async(path, json).await
    }

    async fn get(&self, key: &str) -> Result<Option<R>> {
        let path = self.record_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.record_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn scan(&self, filter: RecordFilter<'_, R>) -> Result<Vec<R>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                // removed between read_dir and read
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            match serde_json::from_str::<R>(&content) {
                Ok(record) if filter(&record) => records.push(record),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable record"),
            }
        }

        Ok(records)
    }
}

/// In-process store, handy for tests and ephemeral drives.
pub struct MemoryStore<R> {
    records: RwLock<HashMap<String, R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<R> RecordStore<R> for MemoryStore<R>
where
    R: Clone + Send + Sync + 'static,
{
    async fn put(&self, key: &str, record: &R) -> Result<()> {
        validate_key(key)?;
        self.records.write().await.insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<R>> {
        validate_key(key)?;
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.records.write().await.remove(key).is_some())
    }

    async fn scan(&self, filter: RecordFilter<'_, R>) -> Result<Vec<R>> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| filter(r)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn put_get_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonDirStore::<Value>::open(temp_dir.path()).await.unwrap();

        store.put("abc", &json!({ "n": 1 })).await.unwrap();
        store.put("abc", &json!({ "n": 2 })).await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), Some(json!({ "n": 2 })));
        assert_eq!(entries(temp_dir.path()), vec!["abc.json"]);

        assert!(store.delete("abc").await.unwrap());
        assert!(store.get("abc").await.unwrap().is_none());
        assert!(matches!(
            store.put("../x", &json!(null)).await,
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn failed_put_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonDirStore::<Value>::open(temp_dir.path()).await.unwrap();
        std::fs::create_dir(temp_dir.path().join("abc.json")).unwrap();

        assert!(store.put("abc", &json!({ "n": 1 })).await.is_err());
        assert_eq!(entries(temp_dir.path()), vec!["abc.json"]);
    }
}
