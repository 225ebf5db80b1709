use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{BatchJobId, FileRecordId, FolderId};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    pub record_id: FileRecordId,
    pub folder_id: FolderId,
    pub batch_job_id: BatchJobId,
    pub file_name: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisOutcome {
    pub result_id: Uuid,
    pub transcript: String,
    #[serde(default)]
    pub scores: serde_json::Value,
    pub confidence: f32,
}

/// External transcription and scoring service.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(
        &self,
        file_path: &Path,
        metadata: &AnalysisMetadata,
    ) -> Result<AnalysisOutcome, AnalysisError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis temporarily unavailable: {0}")]
    Transient(String),
    /// The service refused the audio itself; retrying cannot help.
    #[error("analysis rejected the file: {0}")]
    Rejected(String),
}

impl AnalysisError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::Transient(_))
    }
}
