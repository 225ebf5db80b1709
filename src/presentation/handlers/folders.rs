use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::services::FolderState;
use crate::application::validation::{ValidationReport, validate_folder_config};
use crate::domain::{
    FolderConfig, FolderId, MonitorConfig, ProcessingOverrides, RemoteFile, StorageConfig,
};
use crate::presentation::state::AppState;

use super::api_error::ApiError;
use super::api_response::{accepted, created, ok};

#[derive(Debug, Deserialize)]
pub struct FolderRequest {
    pub name: String,
    pub storage: StorageConfig,
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub processing: ProcessingOverrides,
    #[serde(default)]
    pub active: Option<bool>,
}

impl FolderRequest {
    fn into_folder(self) -> FolderConfig {
        let mut folder = FolderConfig::new(self.name, self.storage, self.monitor, self.processing);
        folder.active = self.active.unwrap_or(true);
        folder
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListFoldersQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// Folder with credentials masked, plus its live runtime state.
#[derive(Debug, Serialize)]
pub struct FolderView {
    #[serde(flatten)]
    pub folder: FolderConfig,
    pub state: FolderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PushEventsRequest {
    pub files: Vec<PushedObject>,
}

#[derive(Debug, Deserialize)]
pub struct PushedObject {
    pub path: String,
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PushEventsResponse {
    pub accepted: usize,
}

async fn view(state: &AppState, folder: FolderConfig) -> FolderView {
    FolderView {
        state: state.processor.folder_state(folder.id).await,
        folder: folder.redacted(),
        start_error: None,
    }
}

async fn load(state: &AppState, id: Uuid) -> Result<FolderConfig, ApiError> {
    state
        .folders
        .get_by_id(FolderId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("folder {id} not found")))
}

fn check(folder: &FolderConfig, state: &AppState) -> Result<(), ApiError> {
    validate_folder_config(folder, state.processor.defaults())
        .into_result()
        .map_err(ApiError::invalid_config)
}

#[tracing::instrument(skip_all)]
pub async fn list_folders_handler(
    State(state): State<AppState>,
    query: Result<Query<ListFoldersQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let folders = state.folders.list(query.active_only).await?;
    let mut views = Vec::with_capacity(folders.len());
    for folder in folders {
        views.push(view(&state, folder).await);
    }
    Ok(ok(views))
}

#[tracing::instrument(skip_all)]
pub async fn create_folder_handler(
    State(state): State<AppState>,
    body: Result<Json<FolderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let folder = body.into_folder();
    check(&folder, &state)?;
    state.folders.create(&folder).await?;
    tracing::info!(folder_id = %folder.id.as_uuid(), name = %folder.name, "Folder created");

    let auto_start = folder
        .processing
        .resolve(state.processor.defaults())
        .auto_start;
    let mut start_error = None;
    if folder.active && auto_start {
        if let Err(e) = state.processor.start_folder(folder.id).await {
            tracing::warn!(folder_id = %folder.id.as_uuid(), error = %e, "Folder saved but not started");
            start_error = Some(e.to_string());
        }
    }

    let mut response = view(&state, folder).await;
    response.start_error = start_error;
    Ok(created(response))
}

/// Dry-run validation; never persists anything.
pub async fn validate_folder_handler(
    State(state): State<AppState>,
    body: Result<Json<FolderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let folder = body.into_folder();
    let report: ValidationReport = validate_folder_config(&folder, state.processor.defaults());
    Ok(ok(report))
}

#[tracing::instrument(skip(state))]
pub async fn get_folder_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let folder = load(&state, id).await?;
    Ok(ok(view(&state, folder).await))
}

#[tracing::instrument(skip(state, body))]
pub async fn update_folder_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<FolderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let existing = load(&state, id).await?;
    let folder = FolderConfig {
        id: existing.id,
        name: body.name,
        storage: body.storage,
        monitor: body.monitor,
        processing: body.processing,
        active: body.active.unwrap_or(existing.active),
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    check(&folder, &state)?;
    state.folders.update(&folder).await?;
    state.processor.reload_folder(folder.id).await?;
    tracing::info!("Folder updated");
    Ok(ok(view(&state, folder).await))
}

/// Soft delete: the folder is deactivated and its runtime torn down.
/// History stays queryable.
#[tracing::instrument(skip(state))]
pub async fn delete_folder_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let mut folder = load(&state, id).await?;
    if folder.active {
        folder.active = false;
        folder.updated_at = Utc::now();
        state.folders.update(&folder).await?;
        state.processor.reload_folder(folder.id).await?;
        tracing::info!("Folder disabled");
    }
    Ok(ok(view(&state, folder).await))
}

#[tracing::instrument(skip(state))]
pub async fn start_folder_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let folder_state = state.processor.start_folder(FolderId::from_uuid(id)).await?;
    Ok(ok(folder_state))
}

#[tracing::instrument(skip(state))]
pub async fn stop_folder_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    load(&state, id).await?;
    let folder_state = state.processor.stop_folder(FolderId::from_uuid(id)).await?;
    Ok(ok(folder_state))
}

#[tracing::instrument(skip(state))]
pub async fn scan_folder_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let summary = state.processor.scan_now(FolderId::from_uuid(id)).await?;
    Ok(accepted(summary))
}

#[tracing::instrument(skip(state, body))]
pub async fn push_events_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<PushEventsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    if body.files.is_empty() {
        return Err(ApiError::bad_request("files must not be empty"));
    }
    let files: Vec<RemoteFile> = body
        .files
        .into_iter()
        .map(|object| {
            let file = RemoteFile::new(object.path, object.size);
            match object.last_modified {
                Some(at) => file.with_last_modified(at),
                None => file,
            }
        })
        .collect();
    let accepted_files = files.len();
    state
        .processor
        .push_cloud_event(FolderId::from_uuid(id), files)
        .await?;
    Ok(accepted(PushEventsResponse {
        accepted: accepted_files,
    }))
}
