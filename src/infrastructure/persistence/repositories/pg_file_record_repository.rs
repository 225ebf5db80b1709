use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{FileRecordFilter, FileRecordRepository, RepositoryError};
use crate::domain::{BatchJobId, FileError, FileRecord, FileRecordId, FileStatus, FolderId};

use super::query_failed;

pub struct PgFileRecordRepository {
    pool: PgPool,
}

impl PgFileRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FileRecordRow {
    id: Uuid,
    batch_job_id: Uuid,
    folder_id: Uuid,
    file_name: String,
    file_path: String,
    file_size: i64,
    status: String,
    error: Option<Json<FileError>>,
    retry_count: i32,
    max_retries: i32,
    next_retry_at: Option<DateTime<Utc>>,
    analysis_result_id: Option<Uuid>,
    discovered_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<FileRecordRow> for FileRecord {
    type Error = RepositoryError;

    fn try_from(r: FileRecordRow) -> Result<Self, Self::Error> {
        Ok(FileRecord {
            id: FileRecordId::from_uuid(r.id),
            batch_job_id: BatchJobId::from_uuid(r.batch_job_id),
            folder_id: FolderId::from_uuid(r.folder_id),
            file_name: r.file_name,
            file_path: r.file_path,
            file_size: r.file_size.max(0) as u64,
            status: r
                .status
                .parse::<FileStatus>()
                .map_err(RepositoryError::QueryFailed)?,
            error: r.error.map(|e| e.0),
            retry_count: r.retry_count.max(0) as u32,
            max_retries: r.max_retries.max(0) as u32,
            next_retry_at: r.next_retry_at,
            analysis_result_id: r.analysis_result_id,
            discovered_at: r.discovered_at,
            updated_at: r.updated_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
        })
    }
}

const SELECT_RECORD: &str = r#"
    SELECT id, batch_job_id, folder_id, file_name, file_path, file_size, status, error,
           retry_count, max_retries, next_retry_at, analysis_result_id, discovered_at,
           updated_at, started_at, completed_at
    FROM file_records
"#;

#[async_trait]
impl FileRecordRepository for PgFileRecordRepository {
    #[instrument(skip_all, fields(record_id = %record.id.as_uuid()))]
    async fn create(&self, record: &FileRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO file_records (id, batch_job_id, folder_id, file_name, file_path, file_size,
                                      status, error, retry_count, max_retries, next_retry_at,
                                      analysis_result_id, discovered_at, updated_at, started_at,
                                      completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.batch_job_id.as_uuid())
        .bind(record.folder_id.as_uuid())
        .bind(&record.file_name)
        .bind(&record.file_path)
        .bind(record.file_size as i64)
        .bind(record.status.as_str())
        .bind(record.error.as_ref().map(Json))
        .bind(record.retry_count as i32)
        .bind(record.max_retries as i32)
        .bind(record.next_retry_at)
        .bind(record.analysis_result_id)
        .bind(record.discovered_at)
        .bind(record.updated_at)
        .bind(record.started_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(())
    }

    #[instrument(skip_all, fields(record_id = %id.as_uuid()))]
    async fn get_by_id(&self, id: FileRecordId) -> Result<Option<FileRecord>, RepositoryError> {
        let row: Option<FileRecordRow> =
            sqlx::query_as(&format!("{SELECT_RECORD} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(query_failed)?;

        row.map(FileRecord::try_from).transpose()
    }

    #[instrument(skip(self, folder_id), fields(folder_id = %folder_id.as_uuid()))]
    async fn find_by_path(
        &self,
        folder_id: FolderId,
        file_path: &str,
    ) -> Result<Option<FileRecord>, RepositoryError> {
        let row: Option<FileRecordRow> = sqlx::query_as(&format!(
            "{SELECT_RECORD} WHERE folder_id = $1 AND file_path = $2 ORDER BY discovered_at DESC LIMIT 1"
        ))
        .bind(folder_id.as_uuid())
        .bind(file_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed)?;

        row.map(FileRecord::try_from).transpose()
    }

    #[instrument(skip_all)]
    async fn list(&self, filter: &FileRecordFilter) -> Result<Vec<FileRecord>, RepositoryError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_RECORD);
        query.push(" WHERE TRUE");
        if let Some(folder_id) = filter.folder_id {
            query.push(" AND folder_id = ").push_bind(folder_id.as_uuid());
        }
        if let Some(job_id) = filter.batch_job_id {
            query.push(" AND batch_job_id = ").push_bind(job_id.as_uuid());
        }
        if !filter.statuses.is_empty() {
            let statuses: Vec<&str> = filter.statuses.iter().map(FileStatus::as_str).collect();
            query.push(" AND status = ANY(").push_bind(statuses).push(")");
        }
        if let Some(name) = &filter.file_name {
            query.push(" AND file_name = ").push_bind(name.clone());
        }
        if let Some(size) = filter.file_size {
            query.push(" AND file_size = ").push_bind(size as i64);
        }
        query.push(" ORDER BY discovered_at");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows: Vec<FileRecordRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;

        rows.into_iter().map(FileRecord::try_from).collect()
    }

    #[instrument(skip_all, fields(record_id = %record.id.as_uuid(), expected = %expected, next = %record.status))]
    async fn update_if_status(
        &self,
        record: &FileRecord,
        expected: FileStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE file_records
            SET batch_job_id = $3, status = $4, error = $5, retry_count = $6, max_retries = $7,
                next_retry_at = $8, analysis_result_id = $9, updated_at = $10, started_at = $11,
                completed_at = $12
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(expected.as_str())
        .bind(record.batch_job_id.as_uuid())
        .bind(record.status.as_str())
        .bind(record.error.as_ref().map(Json))
        .bind(record.retry_count as i32)
        .bind(record.max_retries as i32)
        .bind(record.next_retry_at)
        .bind(record.analysis_result_id)
        .bind(record.updated_at)
        .bind(record.started_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(result.rows_affected() == 1)
    }
}
