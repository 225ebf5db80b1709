use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::application::ports::{FileRecordRepository, RepositoryError};
use crate::domain::{ErrorCode, FileError, FileRecord, FileRecordId, FileStatus, StatusEvent};

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("illegal transition {from} -> {to} for record {}", .record_id.as_uuid())]
    Illegal {
        record_id: FileRecordId,
        from: FileStatus,
        to: FileStatus,
    },
    #[error("record {} was modified concurrently", .0.as_uuid())]
    Conflict(FileRecordId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The single path through which file records change status. Checks the
/// transition table, stamps timestamps, persists with compare-and-set and
/// publishes a [`StatusEvent`].
#[derive(Clone)]
pub struct FileStatusTracker {
    records: Arc<dyn FileRecordRepository>,
    events: broadcast::Sender<StatusEvent>,
}

impl FileStatusTracker {
    pub fn new(records: Arc<dyn FileRecordRepository>, events: broadcast::Sender<StatusEvent>) -> Self {
        Self { records, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Publishes an event that is not a file transition, e.g. batch counters.
    pub fn publish(&self, event: StatusEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Moves `record` to `to`. Fields other than status, error and
    /// timestamps are persisted as the caller left them. On success `record`
    /// reflects the stored row.
    pub async fn transition(
        &self,
        record: &mut FileRecord,
        to: FileStatus,
        error: Option<FileError>,
    ) -> Result<(), TransitionError> {
        let from = record.status;
        if !from.can_transition_to(to) {
            return Err(TransitionError::Illegal {
                record_id: record.id,
                from,
                to,
            });
        }

        let now = Utc::now();
        let mut next = record.clone();
        next.status = to;
        next.updated_at = now;
        match to {
            FileStatus::Processing => {
                next.started_at = Some(now);
                next.next_retry_at = None;
            }
            FileStatus::Completed => {
                next.error = None;
                next.completed_at = Some(now);
            }
            FileStatus::Failed | FileStatus::Skipped => {
                next.error = Some(error.unwrap_or_else(|| {
                    FileError::new(ErrorCode::SystemError, format!("file {to} without a reason"))
                }));
                next.completed_at = Some(now);
            }
            FileStatus::Retrying => {
                next.completed_at = None;
            }
            FileStatus::Discovered | FileStatus::Queued => {}
        }

        if !self.records.update_if_status(&next, from).await? {
            return Err(TransitionError::Conflict(record.id));
        }
        *record = next;

        tracing::debug!(
            record_id = %record.id.as_uuid(),
            file_name = %record.file_name,
            from = %from,
            to = %to,
            "File status transition"
        );
        self.publish(StatusEvent::file_changed(record, from));
        Ok(())
    }
}
