use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{MonitorError, MonitorHandle, MonitorProvider, MonitorTarget};
use crate::domain::{DiscoveryEvent, DiscoverySource, MonitorConfig, MonitorKind, RemoteFile};

use super::debouncer::Debouncer;
use super::watch_set::{Watch, WatchSet};

/// Watches a local directory through OS notifications. Bursts of writes to
/// the same file are debounced into a single discovery. Files already
/// present when the watch starts are reported once up front.
pub struct EventMonitor {
    config: MonitorConfig,
    watches: WatchSet,
}

impl EventMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            watches: WatchSet::default(),
        }
    }
}

#[async_trait::async_trait]
impl MonitorProvider for EventMonitor {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Events
    }

    async fn start_monitoring(
        &self,
        target: MonitorTarget,
        sink: mpsc::Sender<DiscoveryEvent>,
    ) -> Result<MonitorHandle, MonitorError> {
        let dir = target.local_path.clone().ok_or_else(|| {
            MonitorError::StartFailed("event monitoring needs a local directory".into())
        })?;
        let canonical = tokio::fs::canonicalize(&dir)
            .await
            .map_err(|e| MonitorError::StartFailed(format!("{}: {e}", dir.display())))?;

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = raw_tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(|e| MonitorError::StartFailed(e.to_string()))?;
        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&canonical, mode)
            .map_err(|e| MonitorError::StartFailed(e.to_string()))?;

        let handle = MonitorHandle::new(target.folder_id);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watch_loop(WatchContext {
            watcher,
            raw_rx,
            roots: vec![canonical, dir],
            target,
            sink,
            config: self.config.clone(),
            cancel: cancel.clone(),
        }));
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
            debounce_ms = self.config.debounce_ms,
            recursive = self.config.recursive,
            "Filesystem event monitor started"
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

struct WatchContext {
    // Dropping the watcher ends OS notifications.
    watcher: RecommendedWatcher,
    raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    /// Canonical directory first, then the configured spelling.
    roots: Vec<PathBuf>,
    target: MonitorTarget,
    sink: mpsc::Sender<DiscoveryEvent>,
    config: MonitorConfig,
    cancel: CancellationToken,
}

async fn watch_loop(mut ctx: WatchContext) {
    let folder_id = ctx.target.folder_id;

    match ctx.target.storage.list_files(&ctx.target.root).await {
        Ok(files) => {
            let existing: Vec<RemoteFile> = files
                .into_iter()
                .filter(|f| ctx.config.recursive || !f.is_nested_under(&ctx.target.root))
                .collect();
            if !existing.is_empty() {
                let event = DiscoveryEvent::new(folder_id, existing, DiscoverySource::FileSystemEvent);
                if ctx.sink.send(event).await.is_err() {
                    return;
                }
            }
        }
        Err(e) => tracing::warn!(
            folder_id = %folder_id.as_uuid(),
            error = %e,
            "Initial listing failed"
        ),
    }

    let window = ctx.config.debounce();
    let mut debouncer: Debouncer = Debouncer::new(window);
    loop {
        let deadline = debouncer.next_deadline();
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            Some(res) = ctx.raw_rx.recv() => match res {
                Ok(event) if is_relevant(&event.kind) => {
                    let now = Instant::now();
                    for path in &event.paths {
                        if let Some(key) = relative_key(path, &ctx.roots) {
                            if ctx.config.recursive || !key.contains('/') {
                                debouncer.record(key, (), now);
                            }
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    folder_id = %folder_id.as_uuid(),
                    error = %e,
                    "Filesystem watch error"
                ),
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(|| Instant::now() + window)), if deadline.is_some() => {
                let ready = debouncer.drain_ready(Instant::now());
                let mut files = Vec::with_capacity(ready.len());
                for (key, ()) in ready {
                    if let Some(file) = stat(&ctx.roots[0], &key).await {
                        files.push(file);
                    }
                }
                if files.is_empty() {
                    continue;
                }
                tracing::debug!(folder_id = %folder_id.as_uuid(), files = files.len(), "Filesystem changes settled");
                let event = DiscoveryEvent::new(folder_id, files, DiscoverySource::FileSystemEvent);
                if ctx.sink.send(event).await.is_err() {
                    tracing::warn!("Discovery channel closed, event monitor stops");
                    break;
                }
            }
        }
    }

    drop(ctx.watcher);
    tracing::debug!(folder_id = %folder_id.as_uuid(), "Filesystem event monitor stopped");
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Path relative to the first matching root, `/`-separated.
fn relative_key(path: &Path, roots: &[PathBuf]) -> Option<String> {
    let relative = roots.iter().find_map(|root| path.strip_prefix(root).ok())?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

async fn stat(root: &Path, key: &str) -> Option<RemoteFile> {
    let meta = tokio::fs::metadata(root.join(key)).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    let file = RemoteFile::new(key, meta.len());
    Some(match meta.modified() {
        Ok(modified) => file.with_last_modified(DateTime::<Utc>::from(modified)),
        Err(_) => file,
    })
}
