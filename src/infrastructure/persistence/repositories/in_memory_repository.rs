use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{
    BatchJobRepository, FileRecordFilter, FileRecordRepository, FolderRepository,
    NotificationConfigRepository, RepositoryError,
};
use crate::domain::{
    BatchJob, BatchJobId, FileRecord, FileRecordId, FileStatus, FolderConfig, FolderId,
    NotificationConfig, NotificationConfigId,
};

/// Process-local stores used when no database is configured and in tests.
/// State is lost on restart.
#[derive(Default)]
pub struct InMemoryFolderRepository {
    folders: RwLock<HashMap<FolderId, FolderConfig>>,
}

#[async_trait]
impl FolderRepository for InMemoryFolderRepository {
    async fn create(&self, folder: &FolderConfig) -> Result<(), RepositoryError> {
        let mut folders = self.folders.write().await;
        if folders.contains_key(&folder.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "folder {} already exists",
                folder.id.as_uuid()
            )));
        }
        folders.insert(folder.id, folder.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: FolderId) -> Result<Option<FolderConfig>, RepositoryError> {
        Ok(self.folders.read().await.get(&id).cloned())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<FolderConfig>, RepositoryError> {
        let mut folders: Vec<FolderConfig> = self
            .folders
            .read()
            .await
            .values()
            .filter(|f| !active_only || f.active)
            .cloned()
            .collect();
        folders.sort_by_key(|f| f.created_at);
        Ok(folders)
    }

    async fn update(&self, folder: &FolderConfig) -> Result<(), RepositoryError> {
        let mut folders = self.folders.write().await;
        match folders.get_mut(&folder.id) {
            Some(existing) => {
                *existing = folder.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(folder.id.as_uuid().to_string())),
        }
    }
}

#[derive(Default)]
pub struct InMemoryBatchJobRepository {
    jobs: RwLock<HashMap<BatchJobId, BatchJob>>,
}

#[async_trait]
impl BatchJobRepository for InMemoryBatchJobRepository {
    async fn create(&self, job: &BatchJob) -> Result<(), RepositoryError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: BatchJobId) -> Result<Option<BatchJob>, RepositoryError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        folder_id: Option<FolderId>,
        limit: usize,
    ) -> Result<Vec<BatchJob>, RepositoryError> {
        let mut jobs: Vec<BatchJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| folder_id.is_none_or(|id| j.folder_id == id))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn update(&self, job: &BatchJob) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(job.id.as_uuid().to_string())),
        }
    }
}

#[derive(Default)]
pub struct InMemoryFileRecordRepository {
    records: RwLock<HashMap<FileRecordId, FileRecord>>,
}

#[async_trait]
impl FileRecordRepository for InMemoryFileRecordRepository {
    async fn create(&self, record: &FileRecord) -> Result<(), RepositoryError> {
        self.records.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: FileRecordId) -> Result<Option<FileRecord>, RepositoryError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_path(
        &self,
        folder_id: FolderId,
        file_path: &str,
    ) -> Result<Option<FileRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.folder_id == folder_id && r.file_path == file_path)
            .max_by_key(|r| r.discovered_at)
            .cloned())
    }

    async fn list(&self, filter: &FileRecordFilter) -> Result<Vec<FileRecord>, RepositoryError> {
        let mut records: Vec<FileRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.discovered_at);
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn update_if_status(
        &self,
        record: &FileRecord,
        expected: FileStatus,
    ) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) if existing.status == expected => {
                *existing = record.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound(record.id.as_uuid().to_string())),
        }
    }
}

#[derive(Default)]
pub struct InMemoryNotificationConfigRepository {
    configs: RwLock<HashMap<NotificationConfigId, NotificationConfig>>,
}

#[async_trait]
impl NotificationConfigRepository for InMemoryNotificationConfigRepository {
    async fn create(&self, config: &NotificationConfig) -> Result<(), RepositoryError> {
        self.configs.write().await.insert(config.id, config.clone());
        Ok(())
    }

    async fn get_by_id(
        &self,
        id: NotificationConfigId,
    ) -> Result<Option<NotificationConfig>, RepositoryError> {
        Ok(self.configs.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<NotificationConfig>, RepositoryError> {
        let mut configs: Vec<NotificationConfig> =
            self.configs.read().await.values().cloned().collect();
        configs.sort_by_key(|c| c.created_at);
        Ok(configs)
    }

    async fn update(&self, config: &NotificationConfig) -> Result<(), RepositoryError> {
        let mut configs = self.configs.write().await;
        match configs.get_mut(&config.id) {
            Some(existing) => {
                *existing = config.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(config.id.as_uuid().to_string())),
        }
    }

    async fn delete(&self, id: NotificationConfigId) -> Result<bool, RepositoryError> {
        Ok(self.configs.write().await.remove(&id).is_some())
    }
}
