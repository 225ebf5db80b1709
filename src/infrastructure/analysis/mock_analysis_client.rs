use std::path::Path;

use uuid::Uuid;

use crate::application::ports::{AnalysisClient, AnalysisError, AnalysisMetadata, AnalysisOutcome};

/// Stand-in used when no analysis service is configured.
pub struct MockAnalysisClient;

#[async_trait::async_trait]
impl AnalysisClient for MockAnalysisClient {
    async fn analyze(
        &self,
        _file_path: &Path,
        metadata: &AnalysisMetadata,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        Ok(AnalysisOutcome {
            result_id: Uuid::new_v4(),
            transcript: format!("Mock transcript for {}", metadata.file_name),
            scores: serde_json::json!({ "overall": 0.0 }),
            confidence: 0.0,
        })
    }
}
