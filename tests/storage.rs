#[cfg(test)]
mod tests {
    use cryptdrive::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Helper to open a drive under a temporary directory
    async fn create_test_storage(chunk_size: usize) -> (DriveStorage, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = StoreConfig::new(temp_dir.path().join("drive")).with_chunk_size(chunk_size);
        let storage = DriveStorage::open(config).await.expect("can't open drive storage");
        (storage, temp_dir)
    }

    fn write_source(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).expect("Failed to write source file");
        path
    }

    #[tokio::test]
    async fn test_encrypt_and_decrypt_round_trip() {
        let (storage, temp_dir) = create_test_storage(config::DEFAULT_CHUNK_SIZE).await;
        let data = b"Hello, encrypted world!".to_vec();
        let source = write_source(&temp_dir, "hello.txt", &data);

        let summary = storage.encrypt_file(&source, "/", None).await.expect("Failed to encrypt");
        assert_eq!(summary.original_name, "hello.txt");
        assert_eq!(summary.folder_path, "/");
        assert_eq!(summary.chunk_count, 1);

        let out = temp_dir.path().join("out.txt");
        storage.decrypt_file(&summary.file_id, &out).await.expect("Failed to decrypt");
        assert_eq!(std::fs::read(&out).unwrap(), data);
    }

    #[tokio::test]
    async fn test_large_file_is_split_into_expected_chunks() {
        let (storage, temp_dir) = create_test_storage(config::DEFAULT_CHUNK_SIZE).await;
        let data: Vec<u8> = (0..2_500_000u32).map(|i| (i % 251) as u8).collect();
        let source = write_source(&temp_dir, "big.bin", &data);

        let summary = storage.encrypt_file(&source, "/", None).await.unwrap();
        assert_eq!(summary.chunk_count, 3);
        assert_eq!(summary.file_id.len(), 16);
        assert!(summary.file_id.chars().all(|c| c.is_ascii_hexdigit()));

        let record = storage.catalog().get(&summary.file_id).await.unwrap();
        assert_eq!(record.original_size, 2_500_000);
        // AES-GCM appends a 16 byte tag
        assert_eq!(record.encrypted_size, 2_500_016);
        let sizes: Vec<u64> = record.chunks.iter().map(|c| c.size).collect();
        assert_eq!(sizes, vec![1_048_576, 1_048_576, 2_500_016 - 2 * 1_048_576]);
        let indices: Vec<u32> = record.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let decrypted = storage.decrypt_bytes(&summary.file_id).await.unwrap();
        assert_eq!(decrypted, data);
    }

    #[tokio::test]
    async fn test_empty_file_round_trips() {
        let (storage, temp_dir) = create_test_storage(1024).await;
        let source = write_source(&temp_dir, "empty.txt", b"");

        let summary = storage.encrypt_file(&source, "/", None).await.unwrap();
        assert_eq!(summary.chunk_count, 1);
        assert!(storage.decrypt_bytes(&summary.file_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_plaintext_gets_distinct_ids() {
        let (storage, _temp_dir) = create_test_storage(1024).await;

        let a = storage.encrypt_bytes(b"same bytes", "a.txt", "/").await.unwrap();
        let b = storage.encrypt_bytes(b"same bytes", "b.txt", "/").await.unwrap();
        assert_ne!(a.file_id, b.file_id);

        let record = storage.catalog().get(&a.file_id).await.unwrap();
        assert_eq!(record.encryption.algorithm, "AES-256-GCM");
        assert_eq!(record.encryption.key_size_bits, 256);
        assert_eq!(record.encryption.nonce_size_bits, 96);
        assert!(matches!(record.encryption.key, KeyMaterial::Raw { .. }));
    }

    #[tokio::test]
    async fn test_encrypt_missing_source_or_folder() {
        let (storage, temp_dir) = create_test_storage(1024).await;

        let missing = temp_dir.path().join("nope.txt");
        let err = storage.encrypt_file(&missing, "/", None).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        let source = write_source(&temp_dir, "a.txt", b"abc");
        let err = storage.encrypt_file(&source, "/Missing", None).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_file_id_is_not_found() {
        let (storage, temp_dir) = create_test_storage(1024).await;

        let err = storage
            .decrypt_file("0123456789abcdef", &temp_dir.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(err.http_status(), 404);

        let err = storage.get_file_info("0123456789abcdef").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_tampered_chunk_writes_no_output() {
        let (storage, temp_dir) = create_test_storage(64).await;
        let data = vec![7u8; 300];
        let summary = storage.encrypt_bytes(&data, "seven.bin", "/").await.unwrap();

        let record = storage.catalog().get(&summary.file_id).await.unwrap();
        let chunk_path = storage.config().chunks_dir().join(&record.chunks[2].location);
        let mut bytes = std::fs::read(&chunk_path).unwrap();
        bytes[0] ^= 0x01;
        std::fs::write(&chunk_path, bytes).unwrap();

        let out = temp_dir.path().join("out.bin");
        let err = storage.decrypt_file(&summary.file_id, &out).await.unwrap_err();
        assert!(matches!(err, StorageError::Integrity(_)));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_move_changes_only_folder_path() {
        let (storage, _temp_dir) = create_test_storage(1024).await;
        storage.create_folder("Docs", "/").await.unwrap();
        let summary = storage.encrypt_bytes(b"report", "report.txt", "/").await.unwrap();
        let before = storage.catalog().get(&summary.file_id).await.unwrap();

        let moved = storage.move_file(&summary.file_id, "/Docs").await.unwrap();
        assert_eq!(moved.folder_path, "/Docs");

        // read back from disk, bypassing the record cache
        let reopened = DriveStorage::open(storage.config().clone().with_record_cache(0))
            .await
            .unwrap();
        let stored = reopened.catalog().get(&summary.file_id).await.unwrap();
        assert_eq!(stored.folder_path, "/Docs");
        assert_eq!(stored.encrypted_size, before.encrypted_size);
        assert_eq!(stored.encryption, before.encryption);
        assert_eq!(stored.chunks.len(), before.chunks.len());
        for (after, original) in stored.chunks.iter().zip(&before.chunks) {
            assert_eq!(after.hash, original.hash);
            assert_eq!(after.location, original.location);
        }

        assert!(storage.list_files("/").await.unwrap().is_empty());
        let docs = storage.list_files("/Docs").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_id, summary.file_id);
        assert_eq!(storage.decrypt_bytes(&summary.file_id).await.unwrap(), b"report");
    }

    #[tokio::test]
    async fn test_move_to_missing_folder_fails() {
        let (storage, _temp_dir) = create_test_storage(1024).await;
        let summary = storage.encrypt_bytes(b"x", "x.txt", "/").await.unwrap();

        let err = storage.move_file(&summary.file_id, "/Nowhere").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        let err = storage.move_file("ffffffffffffffff", "/").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_file_with_and_without_chunks() {
        let (storage, _temp_dir) = create_test_storage(16).await;
        let chunks_dir = storage.config().chunks_dir();

        let kept = storage.encrypt_bytes(&[1u8; 40], "kept.bin", "/").await.unwrap();
        let kept_record = storage.catalog().get(&kept.file_id).await.unwrap();
        storage.delete_file(&kept.file_id, false).await.unwrap();
        assert!(matches!(
            storage.get_file_info(&kept.file_id).await,
            Err(StorageError::NotFound(_))
        ));
        for chunk in &kept_record.chunks {
            assert!(chunks_dir.join(&chunk.location).exists());
        }

        let gone = storage.encrypt_bytes(&[2u8; 40], "gone.bin", "/").await.unwrap();
        let gone_record = storage.catalog().get(&gone.file_id).await.unwrap();
        storage.delete_file(&gone.file_id, true).await.unwrap();
        for chunk in &gone_record.chunks {
            assert!(!chunks_dir.join(&chunk.location).exists());
        }

        let err = storage.delete_file(&gone.file_id, true).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_survives_missing_chunk() {
        let (storage, _temp_dir) = create_test_storage(16).await;
        let summary = storage.encrypt_bytes(&[3u8; 40], "c.bin", "/").await.unwrap();
        let record = storage.catalog().get(&summary.file_id).await.unwrap();
        std::fs::remove_file(storage.config().chunks_dir().join(&record.chunks[0].location)).unwrap();

        storage.delete_file(&summary.file_id, true).await.unwrap();
        assert!(storage.list_all_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_info_fields() {
        let (storage, _temp_dir) = create_test_storage(1024).await;
        let summary = storage.encrypt_bytes(b"abcdef", "letters.txt", "/").await.unwrap();

        let info = storage.get_file_info(&summary.file_id).await.unwrap();
        assert_eq!(info.file_id, summary.file_id);
        assert_eq!(info.name, "letters.txt");
        assert_eq!(info.size, 6);
        assert_eq!(info.encrypted_size, 22);
        assert_eq!(info.algorithm, "AES-256-GCM");
        assert_eq!(info.chunks, 1);
    }

    #[tokio::test]
    async fn test_list_all_files_spans_folders() {
        let (storage, _temp_dir) = create_test_storage(1024).await;
        storage.create_folder("A", "/").await.unwrap();
        storage.encrypt_bytes(b"1", "one.txt", "/").await.unwrap();
        storage.encrypt_bytes(b"2", "two.txt", "/A").await.unwrap();

        let all = storage.list_all_files().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(storage.list_files("/").await.unwrap().len(), 1);
        assert_eq!(storage.list_files("A").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recursive_folder_delete_removes_everything() {
        let (storage, _temp_dir) = create_test_storage(1024).await;
        storage.create_folder("A", "/").await.unwrap();
        storage.create_folder("B", "/A").await.unwrap();
        let top = storage.encrypt_bytes(b"top", "top.txt", "/A").await.unwrap();
        let nested = storage.encrypt_bytes(b"nested", "nested.txt", "/A/B").await.unwrap();
        let outside = storage.encrypt_bytes(b"out", "out.txt", "/").await.unwrap();

        let deletion = storage.delete_folder("/A", true).await.unwrap();
        assert_eq!(deletion.folder_path, "/A");
        assert_eq!(deletion.folders_removed, 2);
        assert_eq!(deletion.files_removed, 2);

        assert!(storage.get_folder("/A").await.unwrap().is_none());
        assert!(storage.get_folder("/A/B").await.unwrap().is_none());
        for id in [&top.file_id, &nested.file_id] {
            assert!(matches!(storage.get_file_info(id).await, Err(StorageError::NotFound(_))));
        }
        assert!(storage.get_file_info(&outside.file_id).await.is_ok());
        assert_eq!(storage.chunks().stored_chunks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_recursive_folder_delete_requires_empty_folder() {
        let (storage, _temp_dir) = create_test_storage(1024).await;
        storage.create_folder("A", "/").await.unwrap();
        storage.create_folder("B", "/A").await.unwrap();
        storage.create_folder("C", "/").await.unwrap();
        storage.encrypt_bytes(b"c", "c.txt", "/C").await.unwrap();

        let err = storage.delete_folder("/A", false).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
        let err = storage.delete_folder("/C", false).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));

        let deletion = storage.delete_folder("/A/B", false).await.unwrap();
        assert_eq!(deletion.folders_removed, 1);
        assert_eq!(deletion.files_removed, 0);
    }

    #[tokio::test]
    async fn test_folder_delete_rejects_root_and_missing() {
        let (storage, _temp_dir) = create_test_storage(1024).await;

        let err = storage.delete_folder("/", true).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
        let err = storage.delete_folder("/ghost", true).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_folder_contents() {
        let (storage, _temp_dir) = create_test_storage(1024).await;
        storage.create_folder("Docs", "/").await.unwrap();
        storage.create_folder("Old", "/Docs").await.unwrap();
        storage.encrypt_bytes(b"d", "d.txt", "/Docs").await.unwrap();
        storage.encrypt_bytes(b"o", "o.txt", "/Docs/Old").await.unwrap();

        let contents = storage.get_folder_contents("Docs/").await.unwrap();
        assert_eq!(contents.folder_path, "/Docs");
        assert_eq!(contents.files.len(), 1);
        assert_eq!(contents.files[0].original_name, "d.txt");
        assert_eq!(contents.folders.len(), 1);
        assert_eq!(contents.folders[0].folder_path, "/Docs/Old");

        let err = storage.get_folder_contents("/Nope").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path().join("drive")).with_chunk_size(32);

        let file_id = {
            let storage = DriveStorage::open(config.clone()).await.unwrap();
            storage.create_folder("Keep", "/").await.unwrap();
            storage.encrypt_bytes(&[9u8; 100], "nine.bin", "/Keep").await.unwrap().file_id
        };

        let storage = DriveStorage::open(config).await.unwrap();
        assert!(storage.get_folder("/Keep").await.unwrap().is_some());
        assert_eq!(storage.decrypt_bytes(&file_id).await.unwrap(), vec![9u8; 100]);
    }

    #[tokio::test]
    async fn test_legacy_hidden_suffix_filters_listings() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = StoreConfig::new(temp_dir.path());
        config.legacy_hidden_suffix = Some(".partial".to_string());
        let storage = DriveStorage::open(config).await.unwrap();

        storage.encrypt_bytes(b"a", "visible.txt", "/").await.unwrap();
        let hidden = storage.encrypt_bytes(b"b", "upload.partial", "/").await.unwrap();

        let listed = storage.list_files("/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_name, "visible.txt");
        assert!(storage.get_file_info(&hidden.file_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_stores() {
        use cryptdrive::catalog::MemoryStore;
        use std::sync::Arc;

        let temp_dir = TempDir::new().unwrap();
        let storage = DriveStorage::with_stores(
            StoreConfig::new(temp_dir.path()),
            Arc::new(MemoryStore::<FileRecord>::new()),
            Arc::new(MemoryStore::<FolderRecord>::new()),
        )
        .await
        .unwrap();

        storage.create_folder("Mem", "/").await.unwrap();
        let summary = storage.encrypt_bytes(b"memory", "m.txt", "/Mem").await.unwrap();
        assert_eq!(storage.decrypt_bytes(&summary.file_id).await.unwrap(), b"memory");
        assert!(!temp_dir.path().join("files").join(format!("{}.json", summary.file_id)).exists());
    }
}
