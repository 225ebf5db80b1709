mod in_memory_repository;
mod pg_batch_job_repository;
mod pg_file_record_repository;
mod pg_folder_repository;
mod pg_notification_config_repository;

pub use in_memory_repository::{
    InMemoryBatchJobRepository, InMemoryFileRecordRepository, InMemoryFolderRepository,
    InMemoryNotificationConfigRepository,
};
pub use pg_batch_job_repository::PgBatchJobRepository;
pub use pg_file_record_repository::PgFileRecordRepository;
pub use pg_folder_repository::PgFolderRepository;
pub use pg_notification_config_repository::PgNotificationConfigRepository;

use crate::application::ports::RepositoryError;

fn query_failed(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_unique_violation() => {
            RepositoryError::ConstraintViolation(db.message().to_string())
        }
        _ => RepositoryError::QueryFailed(e.to_string()),
    }
}
