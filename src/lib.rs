mod atomic;
pub mod catalog;
pub mod chunk;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod path;
pub mod storage;

mod types;

pub use config::StoreConfig;
pub use error::{Result, StorageError};
pub use storage::DriveStorage;
pub use types::*;
