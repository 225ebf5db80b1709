use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::application::validation::{ValidationReport, validate_storage_config};
use crate::domain::{ErrorCode, RemoteFile, StorageConfig, StorageProviderKind};

/// A place audio files are read from. The configuration is bound when the
/// provider is constructed; `connect` verifies it is reachable.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    fn kind(&self) -> StorageProviderKind;

    async fn connect(&self) -> Result<(), StorageError>;

    /// Lists every file under `path`, relative to the provider root.
    async fn list_files(&self, path: &str) -> Result<Vec<RemoteFile>, StorageError>;

    /// Copies `remote_path` to `local_path`, returning the bytes written.
    async fn download_file(&self, remote_path: &str, local_path: &Path)
    -> Result<u64, StorageError>;

    fn validate_config(&self, config: &StorageConfig) -> ValidationReport {
        validate_storage_config(config)
    }

    fn supports_concurrent_calls(&self) -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("listing failed: {0}")]
    ListFailed(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// A missing object stays missing; only transport and listing
    /// failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            StorageError::AccessDenied(_)
                | StorageError::InvalidConfig(_)
                | StorageError::NotFound(_)
        )
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            StorageError::AccessDenied(_) => ErrorCode::AccessDenied,
            StorageError::NotFound(_) => ErrorCode::FileNotFound,
            StorageError::InvalidConfig(_) | StorageError::Io(_) => ErrorCode::SystemError,
            _ => ErrorCode::NetworkError,
        }
    }
}
