use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{FolderRepository, RepositoryError};
use crate::domain::{FolderConfig, FolderId, MonitorConfig, ProcessingOverrides, StorageConfig};

use super::query_failed;

pub struct PgFolderRepository {
    pool: PgPool,
}

impl PgFolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FolderRow {
    id: Uuid,
    name: String,
    storage: Json<StorageConfig>,
    monitor: Json<MonitorConfig>,
    processing: Json<ProcessingOverrides>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FolderRow> for FolderConfig {
    fn from(r: FolderRow) -> Self {
        FolderConfig {
            id: FolderId::from_uuid(r.id),
            name: r.name,
            storage: r.storage.0,
            monitor: r.monitor.0,
            processing: r.processing.0,
            active: r.active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const SELECT_FOLDER: &str = r#"
    SELECT id, name, storage, monitor, processing, active, created_at, updated_at
    FROM folders
"#;

#[async_trait]
impl FolderRepository for PgFolderRepository {
    #[instrument(skip_all, fields(folder_id = %folder.id.as_uuid()))]
    async fn create(&self, folder: &FolderConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO folders (id, name, storage, monitor, processing, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(folder.id.as_uuid())
        .bind(&folder.name)
        .bind(Json(&folder.storage))
        .bind(Json(&folder.monitor))
        .bind(Json(&folder.processing))
        .bind(folder.active)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(())
    }

    #[instrument(skip_all, fields(folder_id = %id.as_uuid()))]
    async fn get_by_id(&self, id: FolderId) -> Result<Option<FolderConfig>, RepositoryError> {
        let row: Option<FolderRow> = sqlx::query_as(&format!("{SELECT_FOLDER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;

        Ok(row.map(FolderConfig::from))
    }

    #[instrument(skip(self))]
    async fn list(&self, active_only: bool) -> Result<Vec<FolderConfig>, RepositoryError> {
        let rows: Vec<FolderRow> = sqlx::query_as(&format!(
            "{SELECT_FOLDER} WHERE ($1 = FALSE OR active = TRUE) ORDER BY created_at"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(rows.into_iter().map(FolderConfig::from).collect())
    }

    #[instrument(skip_all, fields(folder_id = %folder.id.as_uuid()))]
    async fn update(&self, folder: &FolderConfig) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE folders
            SET name = $2, storage = $3, monitor = $4, processing = $5, active = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(folder.id.as_uuid())
        .bind(&folder.name)
        .bind(Json(&folder.storage))
        .bind(Json(&folder.monitor))
        .bind(Json(&folder.processing))
        .bind(folder.active)
        .bind(folder.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(folder.id.as_uuid().to_string()));
        }
        Ok(())
    }
}
