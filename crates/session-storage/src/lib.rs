//! Session storage for the storefront client.
//!
//! This crate provides key-value storage backends and the persisted
//! identity session built on top of them:
//! - **file**: JSON file under `~/.storefront/session.json`
//! - **memory**: in-process map, for tests and ephemeral sessions

mod file;
mod keys;
mod memory;
mod session_store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use session_store::{SessionStore, StoredSession, UserProfile};
pub use traits::SecureStorage;

use client_config_and_utils::Paths;
use std::sync::Arc;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default storage, a JSON file under the client's base dir.
pub fn create_storage(paths: &Paths) -> StorageResult<Arc<dyn SecureStorage>> {
    let storage = FileStorage::open(paths.session_file())?;
    Ok(Arc::new(storage))
}

/// Create a SessionStore over the default storage.
pub fn create_session_store(
    paths: &Paths,
    authority: &str,
    client_id: &str,
) -> StorageResult<SessionStore> {
    let storage = create_storage(paths)?;
    Ok(SessionStore::new(storage, authority, client_id))
}
