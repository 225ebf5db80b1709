use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, multipart};

use crate::application::ports::{AnalysisClient, AnalysisError, AnalysisMetadata, AnalysisOutcome};

/// Uploads the recording as multipart form data to `{base_url}/analyze`
/// and reads back the transcript and scores.
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAnalysisClient {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        "aac" => "audio/aac",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(
        &self,
        file_path: &Path,
        metadata: &AnalysisMetadata,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let url = format!("{}/analyze", self.base_url);
        let audio = tokio::fs::read(file_path)
            .await
            .map_err(|e| AnalysisError::Transient(format!("read working copy: {e}")))?;

        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| AnalysisError::Transient(format!("metadata: {e}")))?;
        let file_part = multipart::Part::bytes(audio)
            .file_name(metadata.file_name.clone())
            .mime_str(mime_for(&metadata.file_name))
            .map_err(|e| AnalysisError::Transient(format!("mime: {e}")))?;
        let form = multipart::Form::new()
            .text("metadata", metadata_json)
            .part("file", file_part);

        tracing::debug!(file_name = %metadata.file_name, bytes = metadata.file_size, "Sending recording for analysis");

        let mut request = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AnalysisError::Transient(format!("request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let message = format!("status {status}: {body}");
            return Err(match status {
                StatusCode::UNSUPPORTED_MEDIA_TYPE | StatusCode::UNPROCESSABLE_ENTITY => {
                    AnalysisError::Rejected(message)
                }
                _ => AnalysisError::Transient(message),
            });
        }

        let outcome: AnalysisOutcome = response
            .json()
            .await
            .map_err(|e| AnalysisError::Transient(format!("body: {e}")))?;
        tracing::info!(
            result_id = %outcome.result_id,
            transcript_chars = outcome.transcript.len(),
            "Analysis completed"
        );
        Ok(outcome)
    }
}
