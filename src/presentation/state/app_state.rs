use std::sync::Arc;

use crate::application::ports::{
    BatchJobRepository, FileRecordRepository, FolderRepository, NotificationConfigRepository,
};
use crate::application::services::{BatchProcessor, NotificationDispatcher, ProviderRegistry};

#[derive(Clone)]
pub struct AppState {
    pub processor: BatchProcessor,
    pub dispatcher: NotificationDispatcher,
    pub registry: Arc<ProviderRegistry>,
    pub folders: Arc<dyn FolderRepository>,
    pub batch_jobs: Arc<dyn BatchJobRepository>,
    pub file_records: Arc<dyn FileRecordRepository>,
    pub notification_configs: Arc<dyn NotificationConfigRepository>,
}
