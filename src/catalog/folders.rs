use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::store::RecordStore;
use crate::path;
use crate::{FolderRecord, Result, StorageError};

/// Path-addressed folder namespace. Records are stored under the hash of
/// their normalized path, so a lookup by path never needs a scan.
#[derive(Clone)]
pub struct FolderDirectory {
    store: Arc<dyn RecordStore<FolderRecord>>,
}

impl FolderDirectory {
    pub fn new(store: Arc<dyn RecordStore<FolderRecord>>) -> Self {
        Self { store }
    }

    pub async fn create(&self, name: &str, parent_path: &str) -> Result<FolderRecord> {
        let name = name.trim().trim_matches('/');
        if name.is_empty() {
            return Err(StorageError::InvalidArgument("folder name cannot be empty".into()));
        }
        if name.contains('/') || name == "." || name == ".." {
            return Err(StorageError::InvalidArgument(format!("invalid folder name: {}", name)));
        }

        let parent_path = path::normalize(parent_path)?;
        if !self.exists(&parent_path).await? {
            return Err(StorageError::NotFound(format!("folder {}", parent_path)));
        }

        let folder_path = path::normalize(&path::join(&parent_path, name))?;
        let folder_id = path::folder_id(&folder_path);
        if self.store.get(&folder_id).await?.is_some() {
            return Err(StorageError::AlreadyExists(format!("folder {}", folder_path)));
        }

        let folder = FolderRecord {
            folder_id,
            folder_name: name.to_string(),
            folder_path,
            parent_path,
            created_at: Utc::now(),
        };
        self.store.put(&folder.folder_id, &folder).await?;

        info!(folder = %folder.folder_path, "folder created");
        Ok(folder)
    }

    /// The root always exists even though it has no record.
    pub async fn exists(&self, folder_path: &str) -> Result<bool> {
        let folder_path = path::normalize(folder_path)?;
        if path::is_root(&folder_path) {
            return Ok(true);
        }
        Ok(self.get(&folder_path).await?.is_some())
    }

    pub async fn get(&self, folder_path: &str) -> Result<Option<FolderRecord>> {
        let folder_path = path::normalize(folder_path)?;
        if path::is_root(&folder_path) {
            return Ok(None);
        }
        self.store.get(&path::folder_id(&folder_path)).await
    }

    /// Direct children of `parent_path`, by name.
    pub async fn list(&self, parent_path: &str) -> Result<Vec<FolderRecord>> {
        let parent_path = path::normalize(parent_path)?;
        let filter = move |folder: &FolderRecord| folder.parent_path == parent_path;
        let mut folders = self.store.scan(&filter).await?;
        folders.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
        Ok(folders)
    }

    pub async fn list_all(&self) -> Result<Vec<FolderRecord>> {
        let mut folders = self.store.scan(&|_: &FolderRecord| true).await?;
        folders.sort_by(|a, b| a.folder_path.cmp(&b.folder_path));
        Ok(folders)
    }

    /// Every folder beneath `folder_path`, children before their parents.
    pub async fn descendants(&self, folder_path: &str) -> Result<Vec<FolderRecord>> {
        let root = path::normalize(folder_path)?;
        let scope = root.clone();
        let filter = move |folder: &FolderRecord| {
            folder.folder_path != scope && path::is_within(&folder.folder_path, &scope)
        };
        let below = self.store.scan(&filter).await?;

        let mut children: HashMap<String, Vec<FolderRecord>> = HashMap::new();
        for folder in below {
            children.entry(folder.parent_path.clone()).or_default().push(folder);
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| b.folder_name.cmp(&a.folder_name));
        }

        let mut ordered = Vec::new();
        let mut stack: Vec<(FolderRecord, bool)> = children
            .remove(&root)
            .unwrap_or_default()
            .into_iter()
            .map(|f| (f, false))
            .collect();

        while let Some((folder, expanded)) = stack.pop() {
            if expanded {
                ordered.push(folder);
                continue;
            }
            let kids = children.remove(&folder.folder_path).unwrap_or_default();
            stack.push((folder, true));
            stack.extend(kids.into_iter().map(|f| (f, false)));
        }

        Ok(ordered)
    }

    /// Removes a folder record. Files are not touched here.
    ///
    /// Returns false when the folder does not exist. Without `recursive` the
    /// call fails while subfolders remain.
    pub async fn delete(&self, folder_path: &str, recursive: bool) -> Result<bool> {
        let folder_path = path::normalize(folder_path)?;
        if path::is_root(&folder_path) {
            return Err(StorageError::InvalidArgument("the root folder cannot be deleted".into()));
        }
        let Some(folder) = self.get(&folder_path).await? else {
            return Ok(false);
        };

        if recursive {
            for child in self.descendants(&folder_path).await? {
                self.store.delete(&child.folder_id).await?;
                info!(folder = %child.folder_path, "folder deleted");
            }
        } else if !self.list(&folder_path).await?.is_empty() {
            return Err(StorageError::InvalidArgument(format!(
                "folder {} still has subfolders",
                folder_path
            )));
        }

        self.store.delete(&folder.folder_id).await?;
        info!(folder = %folder_path, "folder deleted");
        Ok(true)
    }
}
