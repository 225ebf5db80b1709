use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{MonitorError, MonitorHandle, MonitorProvider, MonitorTarget};
use crate::domain::{DiscoveryEvent, DiscoverySource, MonitorConfig, MonitorKind, RemoteFile};

use super::debouncer::Debouncer;
use super::watch_set::{Watch, WatchSet};

const PUSH_BUFFER: usize = 64;

/// Relays object-created notifications pushed by the cloud provider (via
/// the HTTP push endpoint). Repeated notifications for one object collapse
/// into one discovery after the debounce window.
pub struct CloudEventMonitor {
    config: MonitorConfig,
    watches: WatchSet,
}

impl CloudEventMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            watches: WatchSet::default(),
        }
    }
}

#[async_trait::async_trait]
impl MonitorProvider for CloudEventMonitor {
    fn kind(&self) -> MonitorKind {
        MonitorKind::CloudEvents
    }

    async fn start_monitoring(
        &self,
        target: MonitorTarget,
        sink: mpsc::Sender<DiscoveryEvent>,
    ) -> Result<MonitorHandle, MonitorError> {
        let handle = MonitorHandle::new(target.folder_id);
        let cancel = CancellationToken::new();
        let (push_tx, push_rx) = mpsc::channel(PUSH_BUFFER);
        let task = tokio::spawn(relay_loop(
            target,
            sink,
            push_rx,
            self.config.clone(),
            cancel.clone(),
        ));
        self.watches.insert(
            handle,
            Watch {
                cancel,
                task,
                pushes: Some(push_tx),
            },
        );
        tracing::info!(folder_id = %handle.folder_id.as_uuid(), "Cloud event monitor started");
        Ok(handle)
    }

    async fn stop_monitoring(&self, handle: MonitorHandle) -> Result<(), MonitorError> {
        self.watches.stop(handle).await
    }

    async fn push_event(
        &self,
        handle: MonitorHandle,
        files: Vec<RemoteFile>,
    ) -> Result<(), MonitorError> {
        let pusher = self
            .watches
            .pusher(handle)
            .ok_or(MonitorError::UnknownHandle(handle.id))?;
        pusher
            .send(files)
            .await
            .map_err(|_| MonitorError::ChannelClosed)
    }

    async fn stop_all(&self) {
        self.watches.stop_all().await;
    }
}

async fn relay_loop(
    target: MonitorTarget,
    sink: mpsc::Sender<DiscoveryEvent>,
    mut pushes: mpsc::Receiver<Vec<RemoteFile>>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    let window = config.debounce();
    let mut debouncer: Debouncer<RemoteFile> = Debouncer::new(window);
    loop {
        let deadline = debouncer.next_deadline();
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some(files) = pushes.recv() => {
                let now = Instant::now();
                for file in files {
                    if !file.path.starts_with(&target.root) {
                        tracing::debug!(path = %file.path, "Pushed object outside folder root ignored");
                        continue;
                    }
                    if !config.recursive && file.is_nested_under(&target.root) {
                        continue;
                    }
                    debouncer.record(file.path.clone(), file, now);
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(|| Instant::now() + window)), if deadline.is_some() => {
                let files: Vec<RemoteFile> = debouncer
                    .drain_ready(Instant::now())
                    .into_iter()
                    .map(|(_, file)| file)
                    .collect();
                if files.is_empty() {
                    continue;
                }
                let event = DiscoveryEvent::new(target.folder_id, files, DiscoverySource::CloudEvent);
                if sink.send(event).await.is_err() {
                    tracing::warn!("Discovery channel closed, cloud event monitor stops");
                    break;
                }
            }
        }
    }
    tracing::debug!(folder_id = %target.folder_id.as_uuid(), "Cloud event monitor stopped");
}
