pub mod encryption;
pub mod keywrap;

pub use encryption::{file_id, verify_file_id, EncryptionEngine, Sealed, ALGORITHM};
pub use keywrap::{
    derive_master_key, integrity_hash, unwrap_key, unwrap_metadata, verify_integrity, wrap_key,
    wrap_metadata, ClientMetadata,
};
