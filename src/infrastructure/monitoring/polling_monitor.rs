use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{MonitorError, MonitorHandle, MonitorProvider, MonitorTarget};
use crate::domain::{DiscoveryEvent, DiscoverySource, MonitorConfig, MonitorKind, RemoteFile};

use super::watch_set::{Watch, WatchSet};

/// Lists storage on a fixed interval and reports paths it has not reported
/// before, once two consecutive listings agree on their size and
/// modification time.
pub struct PollingMonitor {
    config: MonitorConfig,
    watches: WatchSet,
}

impl PollingMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            watches: WatchSet::default(),
        }
    }
}

#[async_trait::async_trait]
impl MonitorProvider for PollingMonitor {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Polling
    }

    async fn start_monitoring(
        &self,
        target: MonitorTarget,
        sink: mpsc::Sender<DiscoveryEvent>,
    ) -> Result<MonitorHandle, MonitorError> {
        let handle = MonitorHandle::new(target.folder_id);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            target,
            sink,
            self.config.clone(),
            cancel.clone(),
        ));
        self.watches.insert(
            handle,
            Watch {
                cancel,
                task,
                pushes: None,
            },
        );
        tracing::info!(
            folder_id = %handle.folder_id.as_uuid(),
            interval_secs = self.config.scan_interval_secs,
            "Polling monitor started"
        );
        Ok(handle)
    }

    async fn stop_monitoring(&self, handle: MonitorHandle) -> Result<(), MonitorError> {
        self.watches.stop(handle).await
    }

    async fn stop_all(&self) {
        self.watches.stop_all().await;
    }
}

async fn poll_loop(
    target: MonitorTarget,
    sink: mpsc::Sender<DiscoveryEvent>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    let mut tracker = ListingTracker::new(target.root.clone(), config.recursive);
    let mut ticker = tokio::time::interval(config.scan_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let listing = match target.storage.list_files(&target.root).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(
                    folder_id = %target.folder_id.as_uuid(),
                    error = %e,
                    "Polling listing failed"
                );
                continue;
            }
        };

        let fresh = tracker.observe(listing);
        if fresh.is_empty() {
            continue;
        }
        tracing::debug!(
            folder_id = %target.folder_id.as_uuid(),
            files = fresh.len(),
            "Polling found new files"
        );
        let event = DiscoveryEvent::new(target.folder_id, fresh, DiscoverySource::Poll);
        if sink.send(event).await.is_err() {
            tracing::warn!("Discovery channel closed, polling stops");
            break;
        }
    }
}

type Fingerprint = (u64, Option<DateTime<Utc>>);

/// Diffs successive storage listings. A file still being written changes
/// size between listings, so it is held back until it settles.
#[derive(Debug)]
pub struct ListingTracker {
    root: String,
    recursive: bool,
    previous: HashMap<String, Fingerprint>,
    reported: HashSet<String>,
}

impl ListingTracker {
    pub fn new(root: impl Into<String>, recursive: bool) -> Self {
        Self {
            root: root.into(),
            recursive,
            previous: HashMap::new(),
            reported: HashSet::new(),
        }
    }

    /// Returns files that are unreported and unchanged since the previous
    /// listing. Paths missing from `listing` are forgotten, so a path
    /// deleted and re-created is reported again.
    pub fn observe(&mut self, listing: Vec<RemoteFile>) -> Vec<RemoteFile> {
        let current: Vec<RemoteFile> = listing
            .into_iter()
            .filter(|f| self.recursive || !f.is_nested_under(&self.root))
            .collect();

        let mut settled = Vec::new();
        for file in &current {
            if self.reported.contains(&file.path) {
                continue;
            }
            let fingerprint = (file.size, file.last_modified);
            if self.previous.get(&file.path) == Some(&fingerprint) {
                settled.push(file.clone());
            }
        }

        self.previous = current
            .into_iter()
            .map(|f| (f.path, (f.size, f.last_modified)))
            .collect();
        let previous = &self.previous;
        self.reported.retain(|path| previous.contains_key(path));
        self.reported.extend(settled.iter().map(|f| f.path.clone()));
        settled
    }
}
