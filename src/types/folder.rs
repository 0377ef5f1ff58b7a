use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FileListing;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderRecord {
    pub folder_id: String,
    pub folder_name: String,
    pub folder_path: String,
    pub parent_path: String,
    pub created_at: DateTime<Utc>,
}

/// One level of a folder: the files placed directly in it and its direct
/// subfolders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderContents {
    pub folder_path: String,
    pub files: Vec<FileListing>,
    pub folders: Vec<FolderRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderDeletion {
    pub folder_path: String,
    pub folders_removed: usize,
    pub files_removed: usize,
}
