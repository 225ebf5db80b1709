use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{BatchJobRepository, RepositoryError};
use crate::domain::{BatchJob, BatchJobId, BatchJobStatus, BatchTrigger, FolderId};

use super::query_failed;

pub struct PgBatchJobRepository {
    pool: PgPool,
}

impl PgBatchJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BatchJobRow {
    id: Uuid,
    folder_id: Uuid,
    trigger: String,
    status: String,
    total_files: i32,
    processed_files: i32,
    failed_files: i32,
    skipped_files: i32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchJobRow> for BatchJob {
    type Error = RepositoryError;

    fn try_from(r: BatchJobRow) -> Result<Self, Self::Error> {
        Ok(BatchJob {
            id: BatchJobId::from_uuid(r.id),
            folder_id: FolderId::from_uuid(r.folder_id),
            trigger: r
                .trigger
                .parse::<BatchTrigger>()
                .map_err(RepositoryError::QueryFailed)?,
            status: r
                .status
                .parse::<BatchJobStatus>()
                .map_err(RepositoryError::QueryFailed)?,
            total_files: r.total_files.max(0) as u32,
            processed_files: r.processed_files.max(0) as u32,
            failed_files: r.failed_files.max(0) as u32,
            skipped_files: r.skipped_files.max(0) as u32,
            created_at: r.created_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
            updated_at: r.updated_at,
        })
    }
}

const SELECT_JOB: &str = r#"
    SELECT id, folder_id, trigger, status, total_files, processed_files, failed_files,
           skipped_files, created_at, started_at, completed_at, updated_at
    FROM batch_jobs
"#;

#[async_trait]
impl BatchJobRepository for PgBatchJobRepository {
    #[instrument(skip_all, fields(job_id = %job.id.as_uuid()))]
    async fn create(&self, job: &BatchJob) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO batch_jobs (id, folder_id, trigger, status, total_files, processed_files,
                                    failed_files, skipped_files, created_at, started_at,
                                    completed_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.folder_id.as_uuid())
        .bind(job.trigger.as_str())
        .bind(job.status.as_str())
        .bind(job.total_files as i32)
        .bind(job.processed_files as i32)
        .bind(job.failed_files as i32)
        .bind(job.skipped_files as i32)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(())
    }

    #[instrument(skip_all, fields(job_id = %id.as_uuid()))]
    async fn get_by_id(&self, id: BatchJobId) -> Result<Option<BatchJob>, RepositoryError> {
        let row: Option<BatchJobRow> = sqlx::query_as(&format!("{SELECT_JOB} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;

        row.map(BatchJob::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        folder_id: Option<FolderId>,
        limit: usize,
    ) -> Result<Vec<BatchJob>, RepositoryError> {
        let rows: Vec<BatchJobRow> = sqlx::query_as(&format!(
            "{SELECT_JOB} WHERE ($1::uuid IS NULL OR folder_id = $1) ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(folder_id.map(|id| id.as_uuid()))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.into_iter().map(BatchJob::try_from).collect()
    }

    #[instrument(skip_all, fields(job_id = %job.id.as_uuid(), status = %job.status))]
    async fn update(&self, job: &BatchJob) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE batch_jobs
            SET status = $2, total_files = $3, processed_files = $4, failed_files = $5,
                skipped_files = $6, started_at = $7, completed_at = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.status.as_str())
        .bind(job.total_files as i32)
        .bind(job.processed_files as i32)
        .bind(job.failed_files as i32)
        .bind(job.skipped_files as i32)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(job.id.as_uuid().to_string()));
        }
        Ok(())
    }
}
