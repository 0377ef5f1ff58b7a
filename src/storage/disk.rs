use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use super::batch::{BatchReport, WorkerPool};
use super::validation::{ReconcileReport, ValidationManager};
use crate::atomic::write_atomically_async;
use crate::catalog::{FolderDirectory, JsonDirStore, MetadataCatalog, RecordStore};
use crate::chunk::ChunkStore;
use crate::config::StoreConfig;
use crate::crypto::{self, EncryptionEngine};
use crate::path;
use crate::{
    ClientEncryptedPayload, ClientSaveSummary, ClientUpload, EncryptSummary, EncryptionParams,
    FileInfo, FileListing, FileRecord, FolderContents, FolderDeletion, FolderRecord, KeyMaterial,
    Result, StorageError, ENCRYPTED_NAME_PLACEHOLDER,
};

const KEY_SIZE_BITS: u32 = 256;
const NONCE_SIZE_BITS: u32 = 96;

/// One user's drive: encrypted chunked files plus the folder tree they live in.
///
/// Cloning is cheap and clones share the same underlying stores.
#[derive(Clone)]
pub struct DriveStorage {
    config: Arc<StoreConfig>,
    chunks: ChunkStore,
    catalog: MetadataCatalog,
    folders: FolderDirectory,
    engine: EncryptionEngine,
    pool: WorkerPool,
}

impl DriveStorage {
    /// Opens (creating if needed) a drive backed by JSON records on disk.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let files = JsonDirStore::<FileRecord>::open(config.files_dir()).await?;
        let folders = JsonDirStore::<FolderRecord>::open(config.folders_dir()).await?;
        Self::with_stores(config, Arc::new(files), Arc::new(folders)).await
    }

    pub async fn with_stores(
        config: StoreConfig,
        file_store: Arc<dyn RecordStore<FileRecord>>,
        folder_store: Arc<dyn RecordStore<FolderRecord>>,
    ) -> Result<Self> {
        config.validate()?;
        let chunks = ChunkStore::new(config.chunks_dir(), config.chunk_size).await?;
        let catalog = MetadataCatalog::new(file_store)
            .with_cache(config.record_cache_size)
            .with_hidden_suffix(config.legacy_hidden_suffix.clone());
        let folders = FolderDirectory::new(folder_store);
        let pool = WorkerPool::new(config.batch_width);

        Ok(Self {
            config: Arc::new(config),
            chunks,
            catalog,
            folders,
            engine: EncryptionEngine::new(),
            pool,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    pub fn folders(&self) -> &FolderDirectory {
        &self.folders
    }

    pub fn chunks(&self) -> &ChunkStore {
        &self.chunks
    }

    fn validator(&self) -> ValidationManager {
        ValidationManager::new(self.chunks.clone(), self.catalog.clone())
    }

    /// Normalizes `folder_path` and checks it exists. The root always does.
    async fn existing_folder(&self, folder_path: &str) -> Result<String> {
        let folder_path = path::normalize(folder_path)?;
        if !self.folders.exists(&folder_path).await? {
            return Err(StorageError::NotFound(format!("folder {}", folder_path)));
        }
        Ok(folder_path)
    }

    async fn read_source(source: &Path) -> Result<Vec<u8>> {
        match fs::read(source).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(source.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Loads, verifies and reassembles the ciphertext behind a record.
    async fn load_ciphertext(&self, record: &FileRecord) -> Result<Vec<u8>> {
        let loaded = self.chunks.load(&record.chunks).await?;
        let ciphertext = ChunkStore::reassemble(loaded);
        crypto::verify_file_id(&ciphertext, &record.file_id)?;
        Ok(ciphertext)
    }

    pub async fn encrypt_file(
        &self,
        source: &Path,
        folder_path: &str,
        original_name: Option<&str>,
    ) -> Result<EncryptSummary> {
        let name = match original_name {
            Some(name) => name.to_string(),
            None => source
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    StorageError::InvalidArgument(format!("no file name in {}", source.display()))
                })?,
        };
        let plaintext = Self::read_source(source).await?;
        self.encrypt_bytes(&plaintext, &name, folder_path).await
    }

    /// Encrypts an in-memory buffer the same way `encrypt_file` does.
    pub async fn encrypt_bytes(
        &self,
        plaintext: &[u8],
        original_name: &str,
        folder_path: &str,
    ) -> Result<EncryptSummary> {
        let folder_path = self.existing_folder(folder_path).await?;
        if original_name.trim().is_empty() {
            return Err(StorageError::InvalidArgument("file name cannot be empty".into()));
        }
        info!(name = original_name, size = plaintext.len(), "encrypting file");

        let sealed = self.engine.encrypt(plaintext)?;
        let file_id = crypto::file_id(&sealed.ciphertext);
        let chunks = self.chunks.split(&sealed.ciphertext, &file_id).await?;

        let record = FileRecord {
            file_id: file_id.clone(),
            original_name: original_name.to_string(),
            original_size: plaintext.len() as u64,
            encrypted_size: sealed.ciphertext.len() as u64,
            encryption: EncryptionParams {
                algorithm: crypto::ALGORITHM.to_string(),
                key: KeyMaterial::Raw {
                    key: hex::encode(sealed.key),
                },
                nonce: hex::encode(sealed.nonce),
                key_size_bits: KEY_SIZE_BITS,
                nonce_size_bits: NONCE_SIZE_BITS,
            },
            chunks,
            folder_path,
            created_at: Utc::now(),
            integrity_hash: None,
            wrapped_metadata: None,
            client_encrypted: false,
        };
        self.catalog.put(&record).await?;

        info!(file_id = %record.file_id, chunks = record.chunks.len(), "file encrypted");
        Ok(EncryptSummary {
            file_id: record.file_id,
            original_name: record.original_name,
            chunk_count: record.chunks.len(),
            folder_path: record.folder_path,
        })
    }

    /// Decrypts a stored file to `destination`. Nothing is written unless every
    /// check passes.
    pub async fn decrypt_file(&self, file_id: &str, destination: &Path) -> Result<PathBuf> {
        let plaintext = self.decrypt_bytes(file_id).await?;

        write_atomically_async(destination.to_path_buf(), plaintext).await?;

        info!(file_id, destination = %destination.display(), "file decrypted");
        Ok(destination.to_path_buf())
    }

    pub async fn decrypt_bytes(&self, file_id: &str) -> Result<Vec<u8>> {
        let record = self.catalog.get(file_id).await?;
        let key = match (&record.encryption.key, record.client_encrypted) {
            (KeyMaterial::Raw { key }, false) => key,
            _ => {
                return Err(StorageError::InvalidArgument(format!(
                    "file {} is client-encrypted and can only be opened by its owner",
                    file_id
                )))
            }
        };
        let key = hex::decode(key)
            .map_err(|_| StorageError::Integrity(format!("stored key of {} is not hex", file_id)))?;
        let nonce = hex::decode(&record.encryption.nonce)
            .map_err(|_| StorageError::Integrity(format!("stored nonce of {} is not hex", file_id)))?;

        let ciphertext = self.load_ciphertext(&record).await?;
        self.engine.decrypt(&ciphertext, &key, &nonce)
    }

    pub async fn list_files(&self, folder_path: &str) -> Result<Vec<FileListing>> {
        self.catalog.list(folder_path).await
    }

    pub async fn list_all_files(&self) -> Result<Vec<FileListing>> {
        self.catalog.list_all().await
    }

    pub async fn get_file_info(&self, file_id: &str) -> Result<FileInfo> {
        self.catalog.file_info(file_id).await
    }

    /// Re-points a file at another folder. Chunks and keys are untouched.
    pub async fn move_file(&self, file_id: &str, new_folder_path: &str) -> Result<FileRecord> {
        let new_folder_path = self.existing_folder(new_folder_path).await?;
        self.catalog.update_folder_path(file_id, &new_folder_path).await
    }

    /// Removes the record, and the chunk bytes too when `delete_chunks` is set.
    pub async fn delete_file(&self, file_id: &str, delete_chunks: bool) -> Result<()> {
        let record = self.catalog.get(file_id).await?;
        self.catalog.delete(file_id).await?;
        if delete_chunks {
            self.chunks.delete(&record.chunks).await;
        }

        info!(file_id, delete_chunks, "file deleted");
        Ok(())
    }

    pub async fn create_folder(&self, name: &str, parent_path: &str) -> Result<FolderRecord> {
        self.folders.create(name, parent_path).await
    }

    pub async fn list_folders(&self, parent_path: &str) -> Result<Vec<FolderRecord>> {
        self.folders.list(parent_path).await
    }

    pub async fn list_all_folders(&self) -> Result<Vec<FolderRecord>> {
        self.folders.list_all().await
    }

    pub async fn get_folder(&self, folder_path: &str) -> Result<Option<FolderRecord>> {
        self.folders.get(folder_path).await
    }

    async fn delete_files_in(&self, folder_path: &str) -> Result<usize> {
        let records = self.catalog.records_in(folder_path).await?;
        for record in &records {
            self.catalog.delete(&record.file_id).await?;
            self.chunks.delete(&record.chunks).await;
        }
        Ok(records.len())
    }

    /// Deletes a folder. With `recursive`, each descendant is emptied of
    /// files and removed before its parent; the target folder goes last.
    pub async fn delete_folder(&self, folder_path: &str, recursive: bool) -> Result<FolderDeletion> {
        let folder_path = path::normalize(folder_path)?;
        if path::is_root(&folder_path) {
            return Err(StorageError::InvalidArgument("the root folder cannot be deleted".into()));
        }
        if self.folders.get(&folder_path).await?.is_none() {
            return Err(StorageError::NotFound(format!("folder {}", folder_path)));
        }

        let mut deletion = FolderDeletion {
            folder_path: folder_path.clone(),
            ..FolderDeletion::default()
        };

        if recursive {
            for child in self.folders.descendants(&folder_path).await? {
                deletion.files_removed += self.delete_files_in(&child.folder_path).await?;
                self.folders.delete(&child.folder_path, false).await?;
                deletion.folders_removed += 1;
            }
            deletion.files_removed += self.delete_files_in(&folder_path).await?;
        } else if !self.catalog.records_in(&folder_path).await?.is_empty() {
            return Err(StorageError::InvalidArgument(format!(
                "folder {} still contains files",
                folder_path
            )));
        }

        // fails on leftover subfolders when not recursive
        self.folders.delete(&folder_path, false).await?;
        deletion.folders_removed += 1;

        info!(
            folder = %folder_path,
            folders = deletion.folders_removed,
            files = deletion.files_removed,
            "folder tree deleted"
        );
        Ok(deletion)
    }

    /// Files and subfolders directly inside `folder_path`.
    pub async fn get_folder_contents(&self, folder_path: &str) -> Result<FolderContents> {
        let folder_path = self.existing_folder(folder_path).await?;
        let files = self.catalog.list(&folder_path).await?;
        let folders = self.folders.list(&folder_path).await?;
        Ok(FolderContents {
            folder_path,
            files,
            folders,
        })
    }

    /// Stores ciphertext the client produced itself. The server only keeps
    /// wrapped key material and cannot decrypt the result.
    pub async fn save_client_encrypted_file(
        &self,
        ciphertext_path: &Path,
        upload: ClientUpload,
    ) -> Result<ClientSaveSummary> {
        let folder_path = self.existing_folder(&upload.folder_path).await?;
        if upload.wrapped_key.trim().is_empty() {
            return Err(StorageError::InvalidArgument("wrapped key is required".into()));
        }
        if upload.nonce.trim().is_empty() {
            return Err(StorageError::InvalidArgument("nonce is required".into()));
        }

        let ciphertext = Self::read_source(ciphertext_path).await?;
        let file_id = crypto::file_id(&ciphertext);
        let chunks = self.chunks.split(&ciphertext, &file_id).await?;

        let record = FileRecord {
            file_id: file_id.clone(),
            original_name: ENCRYPTED_NAME_PLACEHOLDER.to_string(),
            original_size: upload.original_size,
            encrypted_size: ciphertext.len() as u64,
            encryption: EncryptionParams {
                algorithm: crypto::ALGORITHM.to_string(),
                key: KeyMaterial::Wrapped {
                    wrapped_key: upload.wrapped_key,
                },
                nonce: upload.nonce,
                key_size_bits: KEY_SIZE_BITS,
                nonce_size_bits: NONCE_SIZE_BITS,
            },
            chunks,
            folder_path: folder_path.clone(),
            created_at: Utc::now(),
            integrity_hash: upload.integrity_hash,
            wrapped_metadata: upload.wrapped_metadata,
            client_encrypted: true,
        };
        self.catalog.put(&record).await?;

        info!(file_id = %file_id, chunks = record.chunks.len(), "client-encrypted file stored");
        Ok(ClientSaveSummary { file_id, folder_path })
    }

    /// Verified ciphertext plus everything the client needs to unwrap it.
    pub async fn read_client_encrypted_file(&self, file_id: &str) -> Result<ClientEncryptedPayload> {
        let record = self.catalog.get(file_id).await?;
        let wrapped_key = match (&record.encryption.key, record.client_encrypted) {
            (KeyMaterial::Wrapped { wrapped_key }, true) => wrapped_key.clone(),
            _ => {
                return Err(StorageError::InvalidArgument(format!(
                    "file {} was encrypted server-side",
                    file_id
                )))
            }
        };
        let ciphertext = self.load_ciphertext(&record).await?;

        Ok(ClientEncryptedPayload {
            file_id: record.file_id,
            ciphertext,
            wrapped_key,
            nonce: record.encryption.nonce,
            integrity_hash: record.integrity_hash,
            wrapped_metadata: record.wrapped_metadata,
            original_size: record.original_size,
            folder_path: record.folder_path,
        })
    }

    /// Checks a file's chunks and content id without decrypting it.
    pub async fn verify_file(&self, file_id: &str) -> Result<()> {
        let record = self.catalog.get(file_id).await?;
        self.validator().validate_file(&record).await
    }

    /// Sweeps chunk files left behind without a record.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.validator().reconcile().await
    }

    /// Decrypts many files concurrently; one failure never stops the rest.
    pub async fn decrypt_many(&self, jobs: Vec<(String, PathBuf)>) -> BatchReport<PathBuf> {
        let items = jobs
            .into_iter()
            .map(|(file_id, dest)| (file_id.clone(), (file_id, dest)))
            .collect();
        let drive = self.clone();

        self.pool
            .run(items, move |(file_id, dest): (String, PathBuf)| {
                let drive = drive.clone();
                async move { drive.decrypt_file(&file_id, &dest).await }
            })
            .await
    }

    /// Encrypts many local files into one folder concurrently.
    pub async fn import_files(&self, sources: Vec<PathBuf>, folder_path: &str) -> Result<BatchReport<EncryptSummary>> {
        let folder_path = self.existing_folder(folder_path).await?;
        let items = sources
            .into_iter()
            .map(|source| (source.display().to_string(), source))
            .collect();
        let drive = self.clone();

        let report = self
            .pool
            .run(items, move |source: PathBuf| {
                let drive = drive.clone();
                let folder_path = folder_path.clone();
                async move { drive.encrypt_file(&source, &folder_path, None).await }
            })
            .await;
        Ok(report)
    }

    /// Decrypts a whole subtree into `destination`, mirroring the folder
    /// layout below `folder_path`.
    pub async fn export_folder(&self, folder_path: &str, destination: &Path) -> Result<BatchReport<PathBuf>> {
        let folder_path = self.existing_folder(folder_path).await?;

        let mut jobs = Vec::new();
        let mut taken = HashSet::new();
        let mut stack = vec![(folder_path, destination.to_path_buf())];

        while let Some((current, dir)) = stack.pop() {
            let contents = self.get_folder_contents(&current).await?;
            // subfolders keep their names; files give way on a clash
            for folder in &contents.folders {
                taken.insert(dir.join(&folder.folder_name));
            }
            for file in contents.files {
                let mut target = dir.join(export_name(&file.original_name, &file.file_id));
                if !taken.insert(target.clone()) {
                    warn!(file_id = %file.file_id, "duplicate name in export, prefixing with file id");
                    target = dir.join(format!(
                        "{}_{}",
                        file.file_id,
                        export_name(&file.original_name, &file.file_id)
                    ));
                    taken.insert(target.clone());
                }
                jobs.push((file.file_id, target));
            }
            for folder in contents.folders {
                let sub_dir = dir.join(&folder.folder_name);
                stack.push((folder.folder_path, sub_dir));
            }
        }

        info!(files = jobs.len(), destination = %destination.display(), "exporting folder");
        Ok(self.decrypt_many(jobs).await)
    }
}

/// A single path component safe to create inside the export directory.
fn export_name(original_name: &str, file_id: &str) -> String {
    Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(file_id)
        .to_string()
}
