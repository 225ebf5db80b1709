use async_trait::async_trait;

use crate::domain::{BatchJob, BatchJobId, FolderId};

use super::RepositoryError;

#[async_trait]
pub trait BatchJobRepository: Send + Sync {
    async fn create(&self, job: &BatchJob) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: BatchJobId) -> Result<Option<BatchJob>, RepositoryError>;

    /// Newest first.
    async fn list(
        &self,
        folder_id: Option<FolderId>,
        limit: usize,
    ) -> Result<Vec<BatchJob>, RepositoryError>;

    async fn update(&self, job: &BatchJob) -> Result<(), RepositoryError>;
}
