use callbatch::application::ports::{
    BatchJobRepository, FileRecordFilter, FileRecordRepository, FolderRepository,
    NotificationConfigRepository, RepositoryError,
};
use callbatch::domain::{
    BatchJob, BatchTrigger, FileRecord, FileStatus, FolderConfig, MonitorConfig, MonitorKind,
    NotificationChannelConfig, NotificationCondition, NotificationConfig, ProcessingOverrides,
    RemoteFile, StorageConfig,
};
use callbatch::infrastructure::persistence::{
    InMemoryBatchJobRepository, InMemoryFileRecordRepository, InMemoryFolderRepository,
    InMemoryNotificationConfigRepository,
};

use crate::helpers::test_postgres::TestPostgres;

fn folder(name: &str) -> FolderConfig {
    FolderConfig::new(
        name.to_string(),
        StorageConfig::Local {
            path: format!("/srv/{name}"),
        },
        MonitorConfig::new(MonitorKind::Polling),
        ProcessingOverrides::default(),
    )
}

fn chat_config() -> NotificationConfig {
    NotificationConfig::new(
        "ops".into(),
        NotificationChannelConfig::Chat {
            webhook_url: "https://hooks.slack.com/services/T/B/X".into(),
            channel: None,
            username: None,
        },
        vec![NotificationCondition::BatchFailed],
        None,
    )
}

async fn exercise_folders(repo: &dyn FolderRepository) {
    let mut support = folder("support");
    let sales = folder("sales");
    repo.create(&support).await.unwrap();
    repo.create(&sales).await.unwrap();

    let duplicate = repo.create(&support).await.unwrap_err();
    assert!(matches!(duplicate, RepositoryError::ConstraintViolation(_)));

    support.active = false;
    repo.update(&support).await.unwrap();
    let active = repo.list(true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, sales.id);
    assert_eq!(repo.list(false).await.unwrap().len(), 2);
    let stored = repo.get_by_id(support.id).await.unwrap().unwrap();
    assert!(!stored.active);
    assert_eq!(stored.storage, support.storage);
}

async fn exercise_jobs(folders: &dyn FolderRepository, repo: &dyn BatchJobRepository) {
    let owner = folder("jobs");
    folders.create(&owner).await.unwrap();
    let older = BatchJob::new(owner.id, BatchTrigger::Monitor, 2);
    repo.create(&older).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let mut newer = BatchJob::new(owner.id, BatchTrigger::Manual, 1);
    repo.create(&newer).await.unwrap();

    newer.start();
    repo.update(&newer).await.unwrap();

    let listed = repo.list(Some(owner.id), 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(repo.list(Some(owner.id), 1).await.unwrap().len(), 1);
    let stored = repo.get_by_id(newer.id).await.unwrap().unwrap();
    assert_eq!(stored.trigger, BatchTrigger::Manual);
    assert!(stored.started_at.is_some());
}

async fn exercise_records(
    folders: &dyn FolderRepository,
    jobs: &dyn BatchJobRepository,
    repo: &dyn FileRecordRepository,
) {
    let owner = folder("records");
    folders.create(&owner).await.unwrap();
    let job = BatchJob::new(owner.id, BatchTrigger::Monitor, 2);
    jobs.create(&job).await.unwrap();
    let first = FileRecord::new(job.id, owner.id, &RemoteFile::new("2026/a.mp3", 10), 3);
    let second = FileRecord::new(job.id, owner.id, &RemoteFile::new("2026/b.mp3", 20), 3);
    repo.create(&first).await.unwrap();
    repo.create(&second).await.unwrap();

    let mut queued = first.clone();
    queued.status = FileStatus::Queued;
    assert!(repo.update_if_status(&queued, FileStatus::Discovered).await.unwrap());
    assert!(!repo.update_if_status(&queued, FileStatus::Discovered).await.unwrap());

    let found = repo.find_by_path(owner.id, "2026/b.mp3").await.unwrap().unwrap();
    assert_eq!(found.id, second.id);
    assert!(repo.find_by_path(owner.id, "2026/c.mp3").await.unwrap().is_none());

    let queued_only = repo
        .list(&FileRecordFilter::for_job(job.id).with_statuses(&[FileStatus::Queued]))
        .await
        .unwrap();
    assert_eq!(queued_only.len(), 1);
    assert_eq!(queued_only[0].file_name, "a.mp3");
    let by_size = FileRecordFilter {
        file_size: Some(20),
        ..FileRecordFilter::for_folder(owner.id)
    };
    assert_eq!(repo.list(&by_size).await.unwrap()[0].id, second.id);
}

async fn exercise_notification_configs(repo: &dyn NotificationConfigRepository) {
    let mut config = chat_config();
    repo.create(&config).await.unwrap();

    config.enabled = false;
    repo.update(&config).await.unwrap();
    assert!(!repo.get_by_id(config.id).await.unwrap().unwrap().enabled);
    assert_eq!(repo.list().await.unwrap().len(), 1);

    assert!(repo.delete(config.id).await.unwrap());
    assert!(!repo.delete(config.id).await.unwrap());
    assert!(repo.get_by_id(config.id).await.unwrap().is_none());
}

#[tokio::test]
async fn given_in_memory_folder_repository_when_exercised_then_behaves_like_a_store() {
    exercise_folders(&InMemoryFolderRepository::default()).await;
}

#[tokio::test]
async fn given_in_memory_job_repository_when_listing_then_newest_first() {
    exercise_jobs(
        &InMemoryFolderRepository::default(),
        &InMemoryBatchJobRepository::default(),
    )
    .await;
}

#[tokio::test]
async fn given_in_memory_record_repository_when_exercised_then_compare_and_set_holds() {
    exercise_records(
        &InMemoryFolderRepository::default(),
        &InMemoryBatchJobRepository::default(),
        &InMemoryFileRecordRepository::default(),
    )
    .await;
}

#[tokio::test]
async fn given_in_memory_notification_repository_when_exercised_then_crud_works() {
    exercise_notification_configs(&InMemoryNotificationConfigRepository::default()).await;
}

#[tokio::test]
async fn given_missing_folder_when_updating_in_memory_then_not_found() {
    let repo = InMemoryFolderRepository::default();

    let error = repo.update(&folder("ghost")).await.unwrap_err();

    assert!(matches!(error, RepositoryError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_postgres_repositories_when_exercised_then_same_behavior_as_in_memory() {
    let pg = TestPostgres::new().await;

    exercise_folders(&pg.folders).await;
    exercise_jobs(&pg.folders, &pg.batch_jobs).await;
    exercise_records(&pg.folders, &pg.batch_jobs, &pg.file_records).await;
    exercise_notification_configs(&pg.notification_configs).await;
}
