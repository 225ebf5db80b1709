use async_trait::async_trait;

use crate::domain::{BatchJobId, FileRecord, FileRecordId, FileStatus, FolderId};

use super::RepositoryError;

#[derive(Debug, Clone, Default)]
pub struct FileRecordFilter {
    pub folder_id: Option<FolderId>,
    pub batch_job_id: Option<BatchJobId>,
    pub statuses: Vec<FileStatus>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub limit: Option<usize>,
}

impl FileRecordFilter {
    pub fn for_folder(folder_id: FolderId) -> Self {
        Self {
            folder_id: Some(folder_id),
            ..Self::default()
        }
    }

    pub fn for_job(batch_job_id: BatchJobId) -> Self {
        Self {
            batch_job_id: Some(batch_job_id),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[FileStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        self.folder_id.is_none_or(|id| record.folder_id == id)
            && self.batch_job_id.is_none_or(|id| record.batch_job_id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&record.status))
            && self
                .file_name
                .as_deref()
                .is_none_or(|name| record.file_name == name)
            && self.file_size.is_none_or(|size| record.file_size == size)
    }
}

#[async_trait]
pub trait FileRecordRepository: Send + Sync {
    async fn create(&self, record: &FileRecord) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: FileRecordId) -> Result<Option<FileRecord>, RepositoryError>;

    async fn find_by_path(
        &self,
        folder_id: FolderId,
        file_path: &str,
    ) -> Result<Option<FileRecord>, RepositoryError>;

    /// Oldest discovery first.
    async fn list(&self, filter: &FileRecordFilter) -> Result<Vec<FileRecord>, RepositoryError>;

    /// Persists `record` only if the stored status still equals `expected`.
    /// Returns `false` when another writer got there first.
    async fn update_if_status(
        &self,
        record: &FileRecord,
        expected: FileStatus,
    ) -> Result<bool, RepositoryError>;
}
