mod cache;
pub mod folders;
pub mod metadata;
pub mod store;

pub use folders::FolderDirectory;
pub use metadata::MetadataCatalog;
pub use store::{JsonDirStore, MemoryStore, RecordFilter, RecordStore};
