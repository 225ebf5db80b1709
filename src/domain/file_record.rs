use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BatchJobId, ErrorCode, FileStatus, FolderId, RemoteFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRecordId(Uuid);

impl FileRecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FileRecordId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl FileError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileRecordId,
    pub batch_job_id: BatchJobId,
    pub folder_id: FolderId,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub status: FileStatus,
    pub error: Option<FileError>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub analysis_result_id: Option<Uuid>,
    pub discovered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn new(
        batch_job_id: BatchJobId,
        folder_id: FolderId,
        file: &RemoteFile,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: FileRecordId::new(),
            batch_job_id,
            folder_id,
            file_name: file.name.clone(),
            file_path: file.path.clone(),
            file_size: file.size,
            status: FileStatus::Discovered,
            error: None,
            retry_count: 0,
            max_retries,
            next_retry_at: None,
            analysis_result_id: None,
            discovered_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn has_retry_budget(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}
