use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::FileRecordFilter;
use crate::domain::{BatchJob, BatchJobId, FileRecord, FolderId};
use crate::presentation::state::AppState;

use super::api_error::ApiError;
use super::api_response::{accepted, ok};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListBatchJobsQuery {
    pub folder_id: Option<Uuid>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetryRequest {
    #[serde(default)]
    pub reset_retry_count: bool,
}

impl RetryRequest {
    /// The body is optional; an empty one means no reset.
    pub(super) fn from_body(body: &Bytes) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("invalid retry request: {e}")))
    }
}

#[derive(Debug, Serialize)]
pub struct BatchJobDetail {
    #[serde(flatten)]
    pub job: BatchJob,
    pub files: Vec<FileRecord>,
}

#[tracing::instrument(skip_all)]
pub async fn list_batch_jobs_handler(
    State(state): State<AppState>,
    query: Result<Query<ListBatchJobsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let jobs = state
        .batch_jobs
        .list(query.folder_id.map(FolderId::from_uuid), limit)
        .await?;
    Ok(ok(jobs))
}

#[tracing::instrument(skip(state))]
pub async fn get_batch_job_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let job_id = BatchJobId::from_uuid(id);
    let job = state
        .batch_jobs
        .get_by_id(job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("batch job {id} not found")))?;
    let files = state
        .file_records
        .list(&FileRecordFilter::for_job(job_id))
        .await?;
    Ok(ok(BatchJobDetail { job, files }))
}

#[tracing::instrument(skip(state))]
pub async fn cancel_batch_job_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let job = state.processor.cancel_job(BatchJobId::from_uuid(id)).await?;
    Ok(accepted(job))
}

#[tracing::instrument(skip(state, body))]
pub async fn retry_batch_job_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let options = RetryRequest::from_body(&body)?;
    let job = state
        .processor
        .retry_job(BatchJobId::from_uuid(id), options.reset_retry_count)
        .await?;
    Ok(accepted(job))
}
