use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Integrity check failed: {0}")]
    Integrity(String),
    #[error("Authentication failed: ciphertext or tag was modified")]
    Authentication,
    /// Deliberately carries no detail so callers cannot tell a bad password
    /// from a damaged envelope.
    #[error("Wrong password or corrupt data")]
    WrongPasswordOrCorruptData,
    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StorageError {
    /// Status code the HTTP layer should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            StorageError::NotFound(_) => 404,
            StorageError::AlreadyExists(_) | StorageError::InvalidArgument(_) => 400,
            StorageError::WrongPasswordOrCorruptData => 401,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
