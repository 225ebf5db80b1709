use std::path::PathBuf;
use std::sync::Arc;

use object_store::local::LocalFileSystem;

use crate::application::ports::StorageError;
use crate::domain::StorageProviderKind;

use super::object_storage::ObjectStorageProvider;

impl ObjectStorageProvider {
    /// Reads from a directory on the local filesystem. Paths in listings are
    /// relative to `base_path`.
    pub fn local(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        let fs = LocalFileSystem::new_with_prefix(&base_path).map_err(|e| {
            StorageError::InvalidConfig(format!("{}: {e}", base_path.display()))
        })?;
        Ok(Self::from_store(
            StorageProviderKind::Local,
            Arc::new(fs),
            Some(base_path),
            None,
        ))
    }
}
