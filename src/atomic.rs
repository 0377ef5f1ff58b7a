use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Result, StorageError};

/// Writes through a temp file next to `destination` and renames it into
/// place. The temp file is removed on every failure path.
pub(crate) fn write_atomically(destination: &Path, data: &[u8]) -> Result<()> {
    let parent = match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(destination).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

/// [`write_atomically`] on the blocking pool.
pub(crate) async fn write_atomically_async(destination: PathBuf, data: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || write_atomically(&destination, &data)).await?
}
