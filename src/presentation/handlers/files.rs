use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::ports::FileRecordFilter;
use crate::domain::{BatchJobId, FileRecordId, FileStatus, FolderId};
use crate::presentation::state::AppState;

use super::api_error::ApiError;
use super::api_response::{accepted, ok};
use super::batch_jobs::RetryRequest;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct ListFilesQuery {
    pub folder_id: Option<Uuid>,
    pub batch_job_id: Option<Uuid>,
    /// Comma-separated statuses, e.g. `failed,retrying`.
    pub status: Option<String>,
    pub limit: Option<usize>,
}

impl ListFilesQuery {
    fn into_filter(self) -> Result<FileRecordFilter, ApiError> {
        let statuses = match self.status.as_deref() {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<FileStatus>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(ApiError::bad_request)?,
            None => Vec::new(),
        };
        Ok(FileRecordFilter {
            folder_id: self.folder_id.map(FolderId::from_uuid),
            batch_job_id: self.batch_job_id.map(BatchJobId::from_uuid),
            statuses,
            limit: Some(self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)),
            ..FileRecordFilter::default()
        })
    }
}

#[tracing::instrument(skip_all)]
pub async fn list_files_handler(
    State(state): State<AppState>,
    query: Result<Query<ListFilesQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let records = state.file_records.list(&filter).await?;
    Ok(ok(records))
}

#[tracing::instrument(skip(state))]
pub async fn get_file_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let record = state
        .file_records
        .get_by_id(FileRecordId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("file record {id} not found")))?;
    Ok(ok(record))
}

#[tracing::instrument(skip(state, body))]
pub async fn retry_file_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let options = RetryRequest::from_body(&body)?;
    let job = state
        .processor
        .retry_record(FileRecordId::from_uuid(id), options.reset_retry_count)
        .await?;
    Ok(accepted(job))
}
