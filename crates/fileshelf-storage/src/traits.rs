//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use fileshelf_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound,
            StorageError::IoError(e) => AppError::Internal(format!("IO error: {}", e)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// The metadata tree only ever holds the key returned by [`Storage::put`];
/// where the bytes live is up to the backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist bytes under a freshly generated key and return that key.
    async fn put(&self, data: Vec<u8>) -> StorageResult<String>;

    /// Read the original (`variant == None`) or a derived variant.
    async fn get(&self, storage_key: &str, variant: Option<u32>) -> StorageResult<Vec<u8>>;

    /// Write bytes at a specific key, replacing whatever was there.
    ///
    /// Readers observe either the previous content or the new content,
    /// never a partial write.
    async fn put_with_key(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a key exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
