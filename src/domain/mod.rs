mod batch_job;
mod batch_job_status;
mod error_code;
mod file_record;
mod file_status;
mod folder;
mod monitor_config;
mod notification;
mod processing_config;
mod provider_kind;
mod remote_file;
mod status_event;
mod storage_config;

pub use batch_job::{BatchJob, BatchJobId, BatchTrigger, FileOutcome};
pub use batch_job_status::BatchJobStatus;
pub use error_code::ErrorCode;
pub use file_record::{FileError, FileRecord, FileRecordId};
pub use file_status::FileStatus;
pub use folder::{FolderConfig, FolderId};
pub use monitor_config::{MonitorConfig, MonitorKind};
pub use notification::{
    Notification, NotificationChannel, NotificationChannelConfig, NotificationCondition,
    NotificationConfig, NotificationConfigId, NotificationReceipt, Severity,
};
pub use processing_config::{MIB, ProcessingConfig, ProcessingOverrides};
pub use provider_kind::ProviderKind;
pub use remote_file::{DiscoveryEvent, DiscoverySource, RemoteFile};
pub use status_event::StatusEvent;
pub use storage_config::{REDACTED, StorageConfig, StorageProviderKind};
