use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    BatchJob, BatchJobId, BatchJobStatus, ErrorCode, FileRecord, FileRecordId, FileStatus,
    FolderId,
};

/// Push-feed entry describing one batch or file status change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    FileStatusChanged {
        folder_id: FolderId,
        batch_job_id: BatchJobId,
        record_id: FileRecordId,
        file_name: String,
        from: FileStatus,
        to: FileStatus,
        error_code: Option<ErrorCode>,
        retry_count: u32,
        at: DateTime<Utc>,
    },
    BatchJobUpdated {
        folder_id: FolderId,
        batch_job_id: BatchJobId,
        status: BatchJobStatus,
        total_files: u32,
        processed_files: u32,
        failed_files: u32,
        skipped_files: u32,
        at: DateTime<Utc>,
    },
}

impl StatusEvent {
    pub fn file_changed(record: &FileRecord, from: FileStatus) -> Self {
        StatusEvent::FileStatusChanged {
            folder_id: record.folder_id,
            batch_job_id: record.batch_job_id,
            record_id: record.id,
            file_name: record.file_name.clone(),
            from,
            to: record.status,
            error_code: record.error_code(),
            retry_count: record.retry_count,
            at: record.updated_at,
        }
    }

    pub fn job_updated(job: &BatchJob) -> Self {
        StatusEvent::BatchJobUpdated {
            folder_id: job.folder_id,
            batch_job_id: job.id,
            status: job.status,
            total_files: job.total_files,
            processed_files: job.processed_files,
            failed_files: job.failed_files,
            skipped_files: job.skipped_files,
            at: job.updated_at,
        }
    }

    pub fn folder_id(&self) -> FolderId {
        match self {
            StatusEvent::FileStatusChanged { folder_id, .. }
            | StatusEvent::BatchJobUpdated { folder_id, .. } => *folder_id,
        }
    }
}
