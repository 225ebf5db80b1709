use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::validation::validate_notification_config;
use crate::domain::{
    FolderId, NotificationChannelConfig, NotificationCondition, NotificationConfig,
    NotificationConfigId,
};
use crate::presentation::state::AppState;

use super::api_error::ApiError;
use super::api_response::{created, ok};

#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub name: String,
    pub channel: NotificationChannelConfig,
    pub conditions: Vec<NotificationCondition>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

async fn load(state: &AppState, id: Uuid) -> Result<NotificationConfig, ApiError> {
    state
        .notification_configs
        .get_by_id(NotificationConfigId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("notification config {id} not found")))
}

async fn check(state: &AppState, config: &NotificationConfig) -> Result<(), ApiError> {
    validate_notification_config(config)
        .into_result()
        .map_err(ApiError::invalid_config)?;
    if let Some(folder_id) = config.folder_id {
        if state.folders.get_by_id(folder_id).await?.is_none() {
            return Err(ApiError::invalid_config(vec![format!(
                "folder_id {} does not exist",
                folder_id.as_uuid()
            )]));
        }
    }
    Ok(())
}

#[tracing::instrument(skip_all)]
pub async fn list_notifications_handler(
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let configs: Vec<NotificationConfig> = state
        .notification_configs
        .list()
        .await?
        .iter()
        .map(NotificationConfig::redacted)
        .collect();
    Ok(ok(configs))
}

#[tracing::instrument(skip_all)]
pub async fn create_notification_handler(
    State(state): State<AppState>,
    body: Result<Json<NotificationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let mut config = NotificationConfig::new(body.name, body.channel, body.conditions, body.folder_id);
    config.enabled = body.enabled.unwrap_or(true);
    check(&state, &config).await?;
    state.notification_configs.create(&config).await?;
    tracing::info!(
        config_id = %config.id.as_uuid(),
        channel = %config.channel.channel(),
        "Notification config created"
    );
    Ok(created(config.redacted()))
}

#[tracing::instrument(skip(state))]
pub async fn get_notification_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    Ok(ok(load(&state, id).await?.redacted()))
}

#[tracing::instrument(skip(state, body))]
pub async fn update_notification_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<NotificationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let existing = load(&state, id).await?;
    let config = NotificationConfig {
        id: existing.id,
        name: body.name,
        channel: body.channel,
        conditions: body.conditions,
        enabled: body.enabled.unwrap_or(existing.enabled),
        folder_id: body.folder_id,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    check(&state, &config).await?;
    state.notification_configs.update(&config).await?;
    state.dispatcher.refresh(&config)?;
    tracing::info!("Notification config updated");
    Ok(ok(config.redacted()))
}

#[tracing::instrument(skip(state))]
pub async fn delete_notification_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let config_id = NotificationConfigId::from_uuid(id);
    if !state.notification_configs.delete(config_id).await? {
        return Err(ApiError::not_found(format!(
            "notification config {id} not found"
        )));
    }
    state.dispatcher.forget(config_id).await;
    tracing::info!("Notification config deleted");
    Ok(ok(serde_json::json!({ "deleted": id })))
}

/// Sends one synthetic message through the config and reports the receipt
/// or the delivery error.
#[tracing::instrument(skip(state))]
pub async fn test_notification_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let config = load(&state, id).await?;
    let receipt = state.dispatcher.test_send(&config).await?;
    Ok(ok(receipt))
}
