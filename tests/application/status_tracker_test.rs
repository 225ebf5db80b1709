use std::sync::Arc;

use tokio::sync::broadcast;

use callbatch::application::ports::FileRecordRepository;
use callbatch::application::services::{FileStatusTracker, TransitionError};
use callbatch::domain::{
    BatchJobId, ErrorCode, FileError, FileRecord, FileStatus, FolderId, RemoteFile, StatusEvent,
};
use callbatch::infrastructure::persistence::InMemoryFileRecordRepository;

async fn stored_record() -> (FileStatusTracker, Arc<InMemoryFileRecordRepository>, FileRecord) {
    let records = Arc::new(InMemoryFileRecordRepository::default());
    let (events, _) = broadcast::channel(16);
    let tracker = FileStatusTracker::new(records.clone(), events);
    let record = FileRecord::new(
        BatchJobId::new(),
        FolderId::new(),
        &RemoteFile::new("call-001.mp3", 2_048),
        3,
    );
    records.create(&record).await.unwrap();
    (tracker, records, record)
}

#[tokio::test]
async fn given_discovered_record_when_queued_then_persisted_and_published() {
    let (tracker, records, mut record) = stored_record().await;
    let mut events = tracker.subscribe();

    tracker
        .transition(&mut record, FileStatus::Queued, None)
        .await
        .unwrap();

    let stored = records.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, FileStatus::Queued);
    match events.recv().await.unwrap() {
        StatusEvent::FileStatusChanged { from, to, .. } => {
            assert_eq!(from, FileStatus::Discovered);
            assert_eq!(to, FileStatus::Queued);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn given_illegal_jump_when_transitioning_then_rejected_and_unchanged() {
    let (tracker, records, mut record) = stored_record().await;

    let error = tracker
        .transition(&mut record, FileStatus::Completed, None)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        TransitionError::Illegal {
            from: FileStatus::Discovered,
            to: FileStatus::Completed,
            ..
        }
    ));
    let stored = records.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, FileStatus::Discovered);
}

#[tokio::test]
async fn given_stale_copy_when_transitioning_then_conflict() {
    let (tracker, _records, mut record) = stored_record().await;
    let mut stale = record.clone();
    tracker
        .transition(&mut record, FileStatus::Queued, None)
        .await
        .unwrap();

    let error = tracker
        .transition(&mut stale, FileStatus::Skipped, None)
        .await
        .unwrap_err();

    assert!(matches!(error, TransitionError::Conflict(id) if id == record.id));
    assert_eq!(stale.status, FileStatus::Discovered);
}

#[tokio::test]
async fn given_failure_without_reason_when_transitioning_then_system_error_recorded() {
    let (tracker, _records, mut record) = stored_record().await;
    tracker
        .transition(&mut record, FileStatus::Queued, None)
        .await
        .unwrap();
    tracker
        .transition(&mut record, FileStatus::Processing, None)
        .await
        .unwrap();

    tracker
        .transition(&mut record, FileStatus::Failed, None)
        .await
        .unwrap();

    assert_eq!(record.error_code(), Some(ErrorCode::SystemError));
    assert!(record.started_at.is_some());
    assert!(record.completed_at.is_some());
}

#[tokio::test]
async fn given_failed_record_when_completed_after_retry_then_error_cleared() {
    let (tracker, _records, mut record) = stored_record().await;
    for (to, error) in [
        (FileStatus::Queued, None),
        (FileStatus::Processing, None),
        (
            FileStatus::Failed,
            Some(FileError::new(ErrorCode::NetworkError, "timeout")),
        ),
        (FileStatus::Retrying, None),
        (FileStatus::Processing, None),
        (FileStatus::Completed, None),
    ] {
        tracker.transition(&mut record, to, error).await.unwrap();
    }

    assert_eq!(record.status, FileStatus::Completed);
    assert!(record.error.is_none());
}
