use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BatchJobStatus, FolderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchJobId(Uuid);

impl BatchJobId {
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

impl Default for BatchJobId {
    fn default() -> Self {
        Self::new()
    }
}

/// What started a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchTrigger {
    Monitor,
    Manual,
    Retry,
}

impl BatchTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchTrigger::Monitor => "monitor",
            BatchTrigger::Manual => "manual",
            BatchTrigger::Retry => "retry",
        }
    }
}

impl FromStr for BatchTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monitor" => Ok(BatchTrigger::Monitor),
            "manual" => Ok(BatchTrigger::Manual),
            "retry" => Ok(BatchTrigger::Retry),
            _ => Err(format!("Invalid batch trigger: {}", s)),
        }
    }
}

impl fmt::Display for BatchTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one file, as counted on its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: BatchJobId,
    pub folder_id: FolderId,
    pub trigger: BatchTrigger,
    pub status: BatchJobStatus,
    pub total_files: u32,
    pub processed_files: u32,
    pub failed_files: u32,
    pub skipped_files: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl BatchJob {
    pub fn new(folder_id: FolderId, trigger: BatchTrigger, total_files: u32) -> Self {
        let now = Utc::now();
        Self {
            id: BatchJobId::new(),
            folder_id,
            trigger,
            status: BatchJobStatus::Pending,
            total_files,
            processed_files: 0,
            failed_files: 0,
            skipped_files: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    pub fn settled_files(&self) -> u32 {
        self.processed_files + self.failed_files + self.skipped_files
    }

    pub fn is_settled(&self) -> bool {
        self.settled_files() >= self.total_files
    }

    pub fn start(&mut self) {
        if self.status == BatchJobStatus::Pending {
            let now = Utc::now();
            self.status = BatchJobStatus::Running;
            self.started_at = Some(now);
            self.updated_at = now;
        }
    }

    pub fn record_outcome(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Completed => self.processed_files += 1,
            FileOutcome::Failed => self.failed_files += 1,
            FileOutcome::Skipped => self.skipped_files += 1,
        }
        self.updated_at = Utc::now();
    }

    /// Removes one terminally failed file from this job's accounting when the
    /// file is moved into a retry job.
    pub fn release_failed(&mut self) {
        self.failed_files = self.failed_files.saturating_sub(1);
        self.total_files = self.total_files.saturating_sub(1);
        self.updated_at = Utc::now();
    }

    /// Moves a settled job into its terminal status. A job fails only when
    /// every file failed; partial failures still complete.
    pub fn finish(&mut self, cancelled: bool) -> BatchJobStatus {
        let now = Utc::now();
        self.status = if cancelled {
            BatchJobStatus::Cancelled
        } else if self.total_files > 0 && self.failed_files == self.total_files {
            BatchJobStatus::Failed
        } else {
            BatchJobStatus::Completed
        };
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.completed_at = Some(now);
        self.updated_at = now;
        self.status
    }
}
