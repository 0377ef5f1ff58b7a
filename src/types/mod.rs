mod chunk;
mod folder;
mod metadata;

pub use chunk::{ChunkRecord, LoadedChunk};
pub use folder::{FolderContents, FolderDeletion, FolderRecord};
pub use metadata::{
    ClientEncryptedPayload, ClientSaveSummary, ClientUpload, EncryptSummary, EncryptionParams,
    FileInfo, FileListing, FileRecord, KeyMaterial, ENCRYPTED_NAME_PLACEHOLDER,
};
