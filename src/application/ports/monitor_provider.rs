use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::validation::{ValidationReport, validate_monitor_config};
use crate::domain::{DiscoveryEvent, FolderId, MonitorKind, RemoteFile};

use super::StorageProvider;

/// What a monitor watches on behalf of one folder.
#[derive(Clone)]
pub struct MonitorTarget {
    pub folder_id: FolderId,
    /// Path handed to `StorageProvider::list_files`.
    pub root: String,
    /// Directory on disk, for monitors that rely on OS notifications.
    pub local_path: Option<PathBuf>,
    pub storage: Arc<dyn StorageProvider>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorHandle {
    pub id: Uuid,
    pub folder_id: FolderId,
}

impl MonitorHandle {
    pub fn new(folder_id: FolderId) -> Self {
        Self {
            id: Uuid::new_v4(),
            folder_id,
        }
    }
}

/// Detects new files and reports them as [`DiscoveryEvent`]s on `sink`.
/// Monitors never call into processing directly.
#[async_trait]
pub trait MonitorProvider: Send + Sync {
    fn kind(&self) -> MonitorKind;

    async fn start_monitoring(
        &self,
        target: MonitorTarget,
        sink: mpsc::Sender<DiscoveryEvent>,
    ) -> Result<MonitorHandle, MonitorError>;

    async fn stop_monitoring(&self, handle: MonitorHandle) -> Result<(), MonitorError>;

    /// Feeds externally observed files into a running watch.
    async fn push_event(
        &self,
        _handle: MonitorHandle,
        _files: Vec<RemoteFile>,
    ) -> Result<(), MonitorError> {
        Err(MonitorError::PushUnsupported(self.kind()))
    }

    /// Stops every watch this instance started.
    async fn stop_all(&self);

    fn validate_config(&self, config: &crate::domain::MonitorConfig) -> ValidationReport {
        validate_monitor_config(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("watch failed to start: {0}")]
    StartFailed(String),
    #[error("unknown monitor handle: {0}")]
    UnknownHandle(Uuid),
    #[error("{0} monitors do not accept pushed events")]
    PushUnsupported(MonitorKind),
    #[error("discovery channel closed")]
    ChannelClosed,
}
