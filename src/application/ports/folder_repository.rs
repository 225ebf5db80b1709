use async_trait::async_trait;

use crate::domain::{FolderConfig, FolderId};

use super::RepositoryError;

#[async_trait]
pub trait FolderRepository: Send + Sync {
    async fn create(&self, folder: &FolderConfig) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: FolderId) -> Result<Option<FolderConfig>, RepositoryError>;

    async fn list(&self, active_only: bool) -> Result<Vec<FolderConfig>, RepositoryError>;

    async fn update(&self, folder: &FolderConfig) -> Result<(), RepositoryError>;
}
