use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{MonitorError, MonitorHandle};
use crate::domain::RemoteFile;

pub(super) struct Watch {
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
    pub pushes: Option<mpsc::Sender<Vec<RemoteFile>>>,
}

/// Running watches of one monitor instance, keyed by handle id.
#[derive(Default)]
pub(super) struct WatchSet {
    watches: DashMap<Uuid, Watch>,
}

impl WatchSet {
    pub fn insert(&self, handle: MonitorHandle, watch: Watch) {
        self.watches.insert(handle.id, watch);
    }

    pub async fn stop(&self, handle: MonitorHandle) -> Result<(), MonitorError> {
        let (_, watch) = self
            .watches
            .remove(&handle.id)
            .ok_or(MonitorError::UnknownHandle(handle.id))?;
        watch.cancel.cancel();
        if let Err(e) = watch.task.await {
            tracing::warn!(error = %e, "Watch task ended abnormally");
        }
        Ok(())
    }

    pub async fn stop_all(&self) {
        let ids: Vec<Uuid> = self.watches.iter().map(|w| *w.key()).collect();
        for id in ids {
            if let Some((_, watch)) = self.watches.remove(&id) {
                watch.cancel.cancel();
                let _ = watch.task.await;
            }
        }
    }

    pub fn pusher(&self, handle: MonitorHandle) -> Option<mpsc::Sender<Vec<RemoteFile>>> {
        self.watches
            .get(&handle.id)
            .and_then(|w| w.pushes.clone())
    }
}
