mod analysis_client;
mod batch_job_repository;
mod file_record_repository;
mod folder_repository;
mod monitor_provider;
mod notification_config_repository;
mod notification_provider;
mod provider_factory;
mod repository_error;
mod storage_provider;

pub use analysis_client::{AnalysisClient, AnalysisError, AnalysisMetadata, AnalysisOutcome};
pub use batch_job_repository::BatchJobRepository;
pub use file_record_repository::{FileRecordFilter, FileRecordRepository};
pub use folder_repository::FolderRepository;
pub use monitor_provider::{MonitorError, MonitorHandle, MonitorProvider, MonitorTarget};
pub use notification_config_repository::NotificationConfigRepository;
pub use notification_provider::{NotificationError, NotificationProvider};
pub use provider_factory::{ProviderError, ProviderFactory};
pub use repository_error::RepositoryError;
pub use storage_provider::{StorageError, StorageProvider};
