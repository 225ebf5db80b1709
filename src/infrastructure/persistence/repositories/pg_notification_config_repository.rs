use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{NotificationConfigRepository, RepositoryError};
use crate::domain::{
    FolderId, NotificationChannelConfig, NotificationCondition, NotificationConfig,
    NotificationConfigId,
};

use super::query_failed;

pub struct PgNotificationConfigRepository {
    pool: PgPool,
}

impl PgNotificationConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationConfigRow {
    id: Uuid,
    name: String,
    channel: Json<NotificationChannelConfig>,
    conditions: Vec<String>,
    enabled: bool,
    folder_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<NotificationConfigRow> for NotificationConfig {
    type Error = RepositoryError;

    fn try_from(r: NotificationConfigRow) -> Result<Self, Self::Error> {
        let conditions = r
            .conditions
            .iter()
            .map(|c| c.parse::<NotificationCondition>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepositoryError::QueryFailed)?;

        Ok(NotificationConfig {
            id: NotificationConfigId::from_uuid(r.id),
            name: r.name,
            channel: r.channel.0,
            conditions,
            enabled: r.enabled,
            folder_id: r.folder_id.map(FolderId::from_uuid),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const SELECT_CONFIG: &str = r#"
    SELECT id, name, channel, conditions, enabled, folder_id, created_at, updated_at
    FROM notification_configs
"#;

fn condition_names(config: &NotificationConfig) -> Vec<&'static str> {
    config.conditions.iter().map(|c| c.as_str()).collect()
}

#[async_trait]
impl NotificationConfigRepository for PgNotificationConfigRepository {
    #[instrument(skip_all, fields(config_id = %config.id.as_uuid()))]
    async fn create(&self, config: &NotificationConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO notification_configs (id, name, channel, conditions, enabled, folder_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(config.id.as_uuid())
        .bind(&config.name)
        .bind(Json(&config.channel))
        .bind(condition_names(config))
        .bind(config.enabled)
        .bind(config.folder_id.map(|id| id.as_uuid()))
        .bind(config.created_at)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(())
    }

    #[instrument(skip_all, fields(config_id = %id.as_uuid()))]
    async fn get_by_id(
        &self,
        id: NotificationConfigId,
    ) -> Result<Option<NotificationConfig>, RepositoryError> {
        let row: Option<NotificationConfigRow> =
            sqlx::query_as(&format!("{SELECT_CONFIG} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(query_failed)?;

        row.map(NotificationConfig::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<NotificationConfig>, RepositoryError> {
        let rows: Vec<NotificationConfigRow> =
            sqlx::query_as(&format!("{SELECT_CONFIG} ORDER BY created_at"))
                .fetch_all(&self.pool)
                .await
                .map_err(query_failed)?;

        rows.into_iter().map(NotificationConfig::try_from).collect()
    }

    #[instrument(skip_all, fields(config_id = %config.id.as_uuid()))]
    async fn update(&self, config: &NotificationConfig) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_configs
            SET name = $2, channel = $3, conditions = $4, enabled = $5, folder_id = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(config.id.as_uuid())
        .bind(&config.name)
        .bind(Json(&config.channel))
        .bind(condition_names(config))
        .bind(config.enabled)
        .bind(config.folder_id.map(|id| id.as_uuid()))
        .bind(config.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(config.id.as_uuid().to_string()));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(config_id = %id.as_uuid()))]
    async fn delete(&self, id: NotificationConfigId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM notification_configs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        Ok(result.rows_affected() > 0)
    }
}
