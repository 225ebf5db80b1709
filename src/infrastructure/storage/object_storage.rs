use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use object_store::ObjectStore;
use object_store::path::Path as StorePath;
use tokio::io::AsyncWriteExt;

use crate::application::ports::{StorageError, StorageProvider};
use crate::domain::{RemoteFile, StorageProviderKind};

/// Storage provider backed by any `object_store` implementation. Local
/// directories, Azure containers and S3 buckets differ only in how the
/// store is built.
pub struct ObjectStorageProvider {
    kind: StorageProviderKind,
    store: Arc<dyn ObjectStore>,
    /// Set for local storage; `connect` checks the directory exists.
    base_dir: Option<PathBuf>,
    prefix: Option<String>,
}

impl ObjectStorageProvider {
    pub(super) fn from_store(
        kind: StorageProviderKind,
        store: Arc<dyn ObjectStore>,
        base_dir: Option<PathBuf>,
        prefix: Option<String>,
    ) -> Self {
        Self {
            kind,
            store,
            base_dir,
            prefix: prefix
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
        }
    }

    fn listing_prefix(&self, path: &str) -> Option<StorePath> {
        let path = path.trim_matches('/');
        if !path.is_empty() {
            return Some(StorePath::from(path));
        }
        self.prefix.as_deref().map(StorePath::from)
    }
}

#[async_trait::async_trait]
impl StorageProvider for ObjectStorageProvider {
    fn kind(&self) -> StorageProviderKind {
        self.kind
    }

    async fn connect(&self) -> Result<(), StorageError> {
        if let Some(dir) = &self.base_dir {
            let meta = tokio::fs::metadata(dir).await.map_err(|e| {
                StorageError::ConnectionFailed(format!("{}: {e}", dir.display()))
            })?;
            if !meta.is_dir() {
                return Err(StorageError::ConnectionFailed(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
            return Ok(());
        }

        let prefix = self.listing_prefix("");
        let mut listing = self.store.list(prefix.as_ref());
        match listing.next().await {
            None | Some(Ok(_)) => {
                tracing::debug!(kind = %self.kind, "Storage reachable");
                Ok(())
            }
            Some(Err(e)) => Err(map_store_error(e, StorageError::ConnectionFailed)),
        }
    }

    async fn list_files(&self, path: &str) -> Result<Vec<RemoteFile>, StorageError> {
        let prefix = self.listing_prefix(path);
        let objects: Vec<_> = self
            .store
            .list(prefix.as_ref())
            .try_collect()
            .await
            .map_err(|e| map_store_error(e, StorageError::ListFailed))?;

        let mut files: Vec<RemoteFile> = objects
            .into_iter()
            .map(|meta| {
                RemoteFile::new(meta.location.to_string(), meta.size as u64)
                    .with_last_modified(meta.last_modified)
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn download_file(
        &self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<u64, StorageError> {
        let location = StorePath::from(remote_path);
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_store_error(e, StorageError::DownloadFailed))?;

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(local_path).await?;
        let mut stream = result.into_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| map_store_error(e, StorageError::DownloadFailed))?;
            file.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(remote_path, bytes = written, "Object downloaded");
        Ok(written)
    }
}

fn map_store_error(
    error: object_store::Error,
    fallback: fn(String) -> StorageError,
) -> StorageError {
    match error {
        object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
        object_store::Error::PermissionDenied { path, .. }
        | object_store::Error::Unauthenticated { path, .. } => StorageError::AccessDenied(path),
        other => fallback(other.to_string()),
    }
}
