use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::application::ports::{
    AnalysisClient, AnalysisError, AnalysisMetadata, AnalysisOutcome, BatchJobRepository,
    FileRecordFilter, FileRecordRepository, FolderRepository, MonitorError, MonitorHandle,
    MonitorProvider, MonitorTarget, ProviderError, ProviderFactory, RepositoryError,
    StorageError, StorageProvider,
};
use crate::application::validation::{FileValidator, validate_folder_config};
use crate::domain::{
    BatchJob, BatchJobId, BatchJobStatus, BatchTrigger, DiscoveryEvent, DiscoverySource,
    ErrorCode, FileError, FileOutcome, FileRecord, FileRecordId, FileStatus, FolderConfig,
    FolderId, Notification, NotificationCondition, ProcessingConfig, ProviderKind, RemoteFile,
    Severity, StatusEvent, StorageConfig,
};

use super::file_status_tracker::{FileStatusTracker, TransitionError};
use super::notification_dispatcher::NotificationDispatcher;
use super::provider_registry::{ProviderRegistry, folder_scope};
use super::retry_policy::RetryPolicy;

const STATUS_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum BatchProcessorError {
    #[error("folder {} not found", .0.as_uuid())]
    FolderNotFound(FolderId),
    #[error("folder {} is inactive", .0.as_uuid())]
    FolderInactive(FolderId),
    #[error("folder {} is not running", .0.as_uuid())]
    FolderNotRunning(FolderId),
    #[error("folder {} has no active monitor", .0.as_uuid())]
    NoActiveMonitor(FolderId),
    #[error("{location} is already monitored by folder {}", .folder_id.as_uuid())]
    MonitorConflict { location: String, folder_id: FolderId },
    #[error("batch job {} not found", .0.as_uuid())]
    JobNotFound(BatchJobId),
    #[error("batch job {} is already {status}", .id.as_uuid())]
    JobAlreadyFinished {
        id: BatchJobId,
        status: BatchJobStatus,
    },
    #[error("batch job {} has no failed files to retry", .0.as_uuid())]
    NothingToRetry(BatchJobId),
    #[error("file record {} not found", .0.as_uuid())]
    RecordNotFound(FileRecordId),
    #[error("file record {} is {status}, only failed files can be retried", .id.as_uuid())]
    NotRetryable { id: FileRecordId, status: FileStatus },
    #[error("file record {} used {retry_count} of {max_retries} retries", .id.as_uuid())]
    RetryBudgetExhausted {
        id: FileRecordId,
        retry_count: u32,
        max_retries: u32,
    },
    #[error("configuration invalid: {}", .0.join("; "))]
    ConfigurationInvalid(Vec<String>),
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("monitor: {0}")]
    Monitor(#[from] MonitorError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("status transition: {0}")]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Global processing defaults; folders override individual fields.
    pub defaults: ProcessingConfig,
    /// Downloaded working copies live under here, one directory per record.
    pub work_dir: PathBuf,
    pub queue_capacity: usize,
    pub discovery_capacity: usize,
    pub shutdown_grace: Duration,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            defaults: ProcessingConfig::default(),
            work_dir: std::env::temp_dir().join("callbatch"),
            queue_capacity: 1024,
            discovery_capacity: 256,
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub batch_job_id: Option<BatchJobId>,
    pub discovered: usize,
    pub queued: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct FolderState {
    pub running: bool,
    pub monitoring: bool,
}

struct ActiveMonitor {
    provider: Arc<dyn MonitorProvider>,
    handle: MonitorHandle,
}

/// Everything a started folder needs: its resolved settings, storage
/// connection, work queue and concurrency limit.
struct FolderRuntime {
    folder: FolderConfig,
    /// Key of the physical location, symlinks resolved for local folders.
    location: String,
    processing: ProcessingConfig,
    validator: FileValidator,
    storage: Arc<dyn StorageProvider>,
    storage_lock: Option<Mutex<()>>,
    queue: mpsc::Sender<FileRecordId>,
    semaphore: Arc<Semaphore>,
    monitor: Mutex<Option<ActiveMonitor>>,
    discovery_lock: Mutex<()>,
    worker_stop: CancellationToken,
}

impl FolderRuntime {
    async fn list(&self) -> Result<Vec<RemoteFile>, StorageError> {
        let root = self.folder.storage.root();
        let files = {
            let _serial = match &self.storage_lock {
                Some(lock) => Some(lock.lock().await),
                None => None,
            };
            self.storage.list_files(&root).await?
        };
        if self.folder.monitor.recursive {
            return Ok(files);
        }
        Ok(files
            .into_iter()
            .filter(|f| !f.is_nested_under(&root))
            .collect())
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<u64, StorageError> {
        let _serial = match &self.storage_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        self.storage.download_file(remote_path, local_path).await
    }
}

struct Failure {
    error: FileError,
    retryable: bool,
}

impl Failure {
    fn system(message: impl Into<String>) -> Self {
        Self {
            error: FileError::new(ErrorCode::SystemError, message),
            retryable: true,
        }
    }

    fn terminal(error: FileError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }

    fn from_storage(e: StorageError) -> Self {
        Self {
            error: FileError::new(e.error_code(), format!("download failed: {e}")),
            retryable: e.is_retryable(),
        }
    }

    fn from_analysis(e: AnalysisError) -> Self {
        let code = if e.is_retryable() {
            ErrorCode::ProcessingError
        } else {
            ErrorCode::CorruptedFile
        };
        Self {
            error: FileError::new(code, e.to_string()),
            retryable: e.is_retryable(),
        }
    }
}

struct Inner {
    folders: Arc<dyn FolderRepository>,
    jobs: Arc<dyn BatchJobRepository>,
    records: Arc<dyn FileRecordRepository>,
    factory: Arc<dyn ProviderFactory>,
    registry: Arc<ProviderRegistry>,
    analysis: Arc<dyn AnalysisClient>,
    tracker: FileStatusTracker,
    notifier: NotificationDispatcher,
    settings: ProcessorSettings,
    discovery_tx: mpsc::Sender<DiscoveryEvent>,
    discovery_rx: Mutex<Option<mpsc::Receiver<DiscoveryEvent>>>,
    runtimes: DashMap<FolderId, Arc<FolderRuntime>>,
    /// Storage location key -> folder currently monitoring it.
    watched: DashMap<String, FolderId>,
    /// Folders whose stale `processing` records were already recovered.
    recovered: DashMap<FolderId, ()>,
    cancelled: DashMap<BatchJobId, ()>,
    /// Serializes batch counter updates and failed-record hand-offs.
    job_lock: Mutex<()>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

/// Owns folder lifecycles and drives every discovered file through the
/// status state machine.
#[derive(Clone)]
pub struct BatchProcessor {
    inner: Arc<Inner>,
}

impl BatchProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        folders: Arc<dyn FolderRepository>,
        jobs: Arc<dyn BatchJobRepository>,
        records: Arc<dyn FileRecordRepository>,
        factory: Arc<dyn ProviderFactory>,
        registry: Arc<ProviderRegistry>,
        analysis: Arc<dyn AnalysisClient>,
        notifier: NotificationDispatcher,
        settings: ProcessorSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let (discovery_tx, discovery_rx) = mpsc::channel(settings.discovery_capacity.max(1));
        let tracker = FileStatusTracker::new(Arc::clone(&records), events);
        Self {
            inner: Arc::new(Inner {
                folders,
                jobs,
                records,
                factory,
                registry,
                analysis,
                tracker,
                notifier,
                settings,
                discovery_tx,
                discovery_rx: Mutex::new(Some(discovery_rx)),
                runtimes: DashMap::new(),
                watched: DashMap::new(),
                recovered: DashMap::new(),
                cancelled: DashMap::new(),
                job_lock: Mutex::new(()),
                tasks: TaskTracker::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.tracker.subscribe()
    }

    pub fn defaults(&self) -> &ProcessingConfig {
        &self.inner.settings.defaults
    }

    /// Starts the discovery loop and every active folder that auto-starts.
    /// Records left unfinished by a previous run are picked up again.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> Result<(), BatchProcessorError> {
        if let Some(rx) = self.inner.discovery_rx.lock().await.take() {
            let this = self.clone();
            tokio::spawn(async move { this.run_discovery_loop(rx).await });
        }

        let folders = self.inner.folders.list(true).await?;
        let mut started = 0usize;
        for folder in folders {
            let processing = folder.processing.resolve(&self.inner.settings.defaults);
            if !processing.auto_start {
                tracing::debug!(folder_id = %folder.id.as_uuid(), "Folder does not auto-start");
                continue;
            }
            match self.launch(folder.id).await {
                Ok(()) => started += 1,
                Err(e) => {
                    tracing::error!(
                        folder_id = %folder.id.as_uuid(),
                        folder = %folder.name,
                        error = %e,
                        "Failed to start folder"
                    );
                    self.notify(
                        Notification::new(
                            NotificationCondition::SystemError,
                            Severity::Critical,
                            format!("Folder {} failed to start", folder.name),
                            e.to_string(),
                        )
                        .for_folder(folder.id),
                    );
                }
            }
        }
        tracing::info!(started, "Batch processor initialised");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(folder_id = %folder_id.as_uuid()))]
    pub async fn start_folder(&self, folder_id: FolderId) -> Result<FolderState, BatchProcessorError> {
        self.launch(folder_id).await?;
        Ok(self.folder_state(folder_id).await)
    }

    /// Halts discovery for the folder. Work already queued keeps draining.
    #[tracing::instrument(skip_all, fields(folder_id = %folder_id.as_uuid()))]
    pub async fn stop_folder(&self, folder_id: FolderId) -> Result<FolderState, BatchProcessorError> {
        if let Some(runtime) = self.runtime(folder_id) {
            self.stop_monitor(&runtime).await;
        }
        Ok(self.folder_state(folder_id).await)
    }

    /// Rebuilds a running folder after its configuration changed. Folders
    /// that were not running stay stopped.
    #[tracing::instrument(skip_all, fields(folder_id = %folder_id.as_uuid()))]
    pub async fn reload_folder(&self, folder_id: FolderId) -> Result<FolderState, BatchProcessorError> {
        let previous = self.inner.runtimes.remove(&folder_id).map(|(_, rt)| rt);
        if let Some(runtime) = previous {
            let was_monitoring = self.stop_monitor(&runtime).await;
            runtime.worker_stop.cancel();
            self.inner
                .registry
                .teardown_scope(&folder_scope(folder_id))
                .await;

            let folder = self
                .inner
                .folders
                .get_by_id(folder_id)
                .await?
                .ok_or(BatchProcessorError::FolderNotFound(folder_id))?;
            if folder.active {
                let runtime = self.create_runtime(folder_id).await?;
                if was_monitoring {
                    self.start_monitor(&runtime).await?;
                }
            }
            tracing::info!("Folder reloaded");
        }
        Ok(self.folder_state(folder_id).await)
    }

    pub async fn folder_state(&self, folder_id: FolderId) -> FolderState {
        match self.runtime(folder_id) {
            Some(runtime) => FolderState {
                running: true,
                monitoring: runtime.monitor.lock().await.is_some(),
            },
            None => FolderState {
                running: false,
                monitoring: false,
            },
        }
    }

    /// Lists the folder's storage right now and handles the result as a
    /// discovery event.
    #[tracing::instrument(skip_all, fields(folder_id = %folder_id.as_uuid()))]
    pub async fn scan_now(&self, folder_id: FolderId) -> Result<DiscoverySummary, BatchProcessorError> {
        let runtime = match self.runtime(folder_id) {
            Some(runtime) => runtime,
            None => self.create_runtime(folder_id).await?,
        };
        let files = runtime.list().await?;
        self.handle_discovery(DiscoveryEvent::new(
            folder_id,
            files,
            DiscoverySource::ManualScan,
        ))
        .await
    }

    /// Turns newly seen files into one batch job. Paths already recorded
    /// for the folder are ignored, so repeated events are harmless.
    #[tracing::instrument(
        skip_all,
        fields(folder_id = %event.folder_id.as_uuid(), source = ?event.source, files = event.files.len())
    )]
    pub async fn handle_discovery(
        &self,
        event: DiscoveryEvent,
    ) -> Result<DiscoverySummary, BatchProcessorError> {
        let folder_id = event.folder_id;
        let runtime = self
            .runtime(folder_id)
            .ok_or(BatchProcessorError::FolderNotRunning(folder_id))?;
        let _serial = runtime.discovery_lock.lock().await;

        let mut summary = DiscoverySummary {
            batch_job_id: None,
            discovered: event.files.len(),
            queued: 0,
            skipped: 0,
        };

        let mut seen = HashSet::new();
        let mut fresh = Vec::new();
        for file in event.files {
            if !seen.insert(file.path.clone()) {
                continue;
            }
            if self
                .inner
                .records
                .find_by_path(folder_id, &file.path)
                .await?
                .is_none()
            {
                fresh.push(file);
            }
        }
        if fresh.is_empty() {
            tracing::debug!("No new files");
            return Ok(summary);
        }

        let trigger = match event.source {
            DiscoverySource::ManualScan => BatchTrigger::Manual,
            _ => BatchTrigger::Monitor,
        };
        let mut job = BatchJob::new(folder_id, trigger, fresh.len() as u32);
        job.start();
        self.inner.jobs.create(&job).await?;
        summary.batch_job_id = Some(job.id);
        self.inner.tracker.publish(StatusEvent::job_updated(&job));
        tracing::info!(
            batch_job_id = %job.id.as_uuid(),
            trigger = %trigger,
            files = fresh.len(),
            "Batch job started"
        );
        self.notify(
            Notification::new(
                NotificationCondition::BatchStarted,
                Severity::Info,
                format!("Batch started for {}", runtime.folder.name),
                format!("{} new file(s) discovered", fresh.len()),
            )
            .for_folder(folder_id)
            .for_job(job.id),
        );

        let mut signatures = HashSet::new();
        let mut queued = Vec::new();
        for file in &fresh {
            let mut record =
                FileRecord::new(job.id, folder_id, file, runtime.processing.max_retries);
            self.inner.records.create(&record).await?;
            match self.admit(&runtime, &record, file, &mut signatures).await? {
                None => {
                    self.inner
                        .tracker
                        .transition(&mut record, FileStatus::Queued, None)
                        .await?;
                    queued.push(record.id);
                }
                Some(error) => {
                    self.skip(record, error).await?;
                    summary.skipped += 1;
                }
            }
        }

        summary.queued = queued.len();
        for record_id in queued {
            self.enqueue(folder_id, record_id).await;
        }
        Ok(summary)
    }

    /// Re-enqueues one terminally failed record in a new retry batch.
    #[tracing::instrument(skip_all, fields(record_id = %record_id.as_uuid()))]
    pub async fn retry_record(
        &self,
        record_id: FileRecordId,
        reset_retry_count: bool,
    ) -> Result<BatchJob, BatchProcessorError> {
        let record = self
            .inner
            .records
            .get_by_id(record_id)
            .await?
            .ok_or(BatchProcessorError::RecordNotFound(record_id))?;
        if record.status != FileStatus::Failed {
            return Err(BatchProcessorError::NotRetryable {
                id: record.id,
                status: record.status,
            });
        }
        if !reset_retry_count && !record.has_retry_budget() {
            return Err(BatchProcessorError::RetryBudgetExhausted {
                id: record.id,
                retry_count: record.retry_count,
                max_retries: record.max_retries,
            });
        }
        self.requeue(record.folder_id, vec![record], reset_retry_count)
            .await
    }

    /// Re-enqueues every failed record of a job that may still be retried.
    #[tracing::instrument(skip_all, fields(batch_job_id = %job_id.as_uuid()))]
    pub async fn retry_job(
        &self,
        job_id: BatchJobId,
        reset_retry_count: bool,
    ) -> Result<BatchJob, BatchProcessorError> {
        let job = self
            .inner
            .jobs
            .get_by_id(job_id)
            .await?
            .ok_or(BatchProcessorError::JobNotFound(job_id))?;
        let failed = self
            .inner
            .records
            .list(&FileRecordFilter::for_job(job_id).with_statuses(&[FileStatus::Failed]))
            .await?;
        let eligible: Vec<FileRecord> = failed
            .into_iter()
            .filter(|r| reset_retry_count || r.has_retry_budget())
            .collect();
        if eligible.is_empty() {
            return Err(BatchProcessorError::NothingToRetry(job_id));
        }
        self.requeue(job.folder_id, eligible, reset_retry_count)
            .await
    }

    /// Stops dequeuing work for the job. In-flight files finish; the job
    /// turns `cancelled` once nothing is left in flight.
    #[tracing::instrument(skip_all, fields(batch_job_id = %job_id.as_uuid()))]
    pub async fn cancel_job(&self, job_id: BatchJobId) -> Result<BatchJob, BatchProcessorError> {
        let job = self
            .inner
            .jobs
            .get_by_id(job_id)
            .await?
            .ok_or(BatchProcessorError::JobNotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(BatchProcessorError::JobAlreadyFinished {
                id: job_id,
                status: job.status,
            });
        }
        self.inner.cancelled.insert(job_id, ());

        let pending = self
            .inner
            .records
            .list(&FileRecordFilter::for_job(job_id).with_statuses(&[
                FileStatus::Discovered,
                FileStatus::Queued,
                FileStatus::Retrying,
            ]))
            .await?;
        let cancelled = pending.len();
        for record in pending {
            self.cancel_record(record).await;
        }

        let _guard = self.inner.job_lock.lock().await;
        let mut job = self
            .inner
            .jobs
            .get_by_id(job_id)
            .await?
            .ok_or(BatchProcessorError::JobNotFound(job_id))?;
        if !job.status.is_terminal() && job.is_settled() {
            self.persist_job(&mut job).await;
        }
        tracing::info!(cancelled, status = %job.status, "Batch job cancellation requested");
        Ok(job)
    }

    /// Hands externally reported objects to the folder's cloud-event monitor.
    #[tracing::instrument(skip_all, fields(folder_id = %folder_id.as_uuid(), files = files.len()))]
    pub async fn push_cloud_event(
        &self,
        folder_id: FolderId,
        files: Vec<RemoteFile>,
    ) -> Result<(), BatchProcessorError> {
        let runtime = self
            .runtime(folder_id)
            .ok_or(BatchProcessorError::FolderNotRunning(folder_id))?;
        let active = runtime.monitor.lock().await;
        let monitor = active
            .as_ref()
            .ok_or(BatchProcessorError::NoActiveMonitor(folder_id))?;
        monitor.provider.push_event(monitor.handle, files).await?;
        Ok(())
    }

    /// Stops monitors, stops taking work, waits up to the grace period for
    /// in-flight files and tears the registry down.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        tracing::info!("Batch processor shutting down");
        self.inner.shutdown.cancel();

        let runtimes: Vec<Arc<FolderRuntime>> = self
            .inner
            .runtimes
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for runtime in &runtimes {
            self.stop_monitor(runtime).await;
        }
        self.inner.runtimes.clear();

        let grace = self.inner.settings.shutdown_grace;
        self.inner.tasks.close();
        if tokio::time::timeout(grace, self.inner.tasks.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "In-flight files did not finish within the grace period"
            );
        }
        if !self.inner.notifier.flush(grace).await {
            tracing::warn!("Pending notifications dropped at shutdown");
        }
        self.inner.registry.shutdown().await;
        tracing::info!("Batch processor stopped");
    }

    fn runtime(&self, folder_id: FolderId) -> Option<Arc<FolderRuntime>> {
        self.inner
            .runtimes
            .get(&folder_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn notify(&self, notification: Notification) {
        self.inner.notifier.dispatch(notification);
    }

    async fn launch(&self, folder_id: FolderId) -> Result<(), BatchProcessorError> {
        let runtime = match self.runtime(folder_id) {
            Some(runtime) => runtime,
            None => self.create_runtime(folder_id).await?,
        };
        self.start_monitor(&runtime).await
    }

    async fn create_runtime(
        &self,
        folder_id: FolderId,
    ) -> Result<Arc<FolderRuntime>, BatchProcessorError> {
        let folder = self
            .inner
            .folders
            .get_by_id(folder_id)
            .await?
            .ok_or(BatchProcessorError::FolderNotFound(folder_id))?;
        if !folder.active {
            return Err(BatchProcessorError::FolderInactive(folder_id));
        }
        let defaults = &self.inner.settings.defaults;
        validate_folder_config(&folder, defaults)
            .into_result()
            .map_err(BatchProcessorError::ConfigurationInvalid)?;

        let scope = folder_scope(folder_id);
        let storage = self.inner.factory.create_storage(&scope, &folder.storage)?;
        storage.connect().await?;

        let processing = folder.processing.resolve(defaults);
        let validator = FileValidator::new(&processing).map_err(|e| {
            BatchProcessorError::ConfigurationInvalid(vec![format!("filename_pattern: {e}")])
        })?;
        let (queue, rx) = mpsc::channel(self.inner.settings.queue_capacity.max(1));
        let location = resolve_location(&folder.storage).await;
        let runtime = Arc::new(FolderRuntime {
            location,
            storage_lock: (!storage.supports_concurrent_calls()).then(|| Mutex::new(())),
            semaphore: Arc::new(Semaphore::new(processing.max_concurrent_files.max(1))),
            folder,
            processing,
            validator,
            storage,
            queue,
            monitor: Mutex::new(None),
            discovery_lock: Mutex::new(()),
            worker_stop: CancellationToken::new(),
        });

        match self.inner.runtimes.entry(folder_id) {
            Entry::Occupied(existing) => return Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&runtime));
            }
        }

        let this = self.clone();
        let worker_runtime = Arc::clone(&runtime);
        self.inner
            .tasks
            .spawn(async move { this.run_worker(worker_runtime, rx).await });

        tracing::info!(
            folder_id = %folder_id.as_uuid(),
            storage = %runtime.folder.storage.kind(),
            max_concurrent_files = runtime.processing.max_concurrent_files,
            "Folder runtime started"
        );

        let interrupted = self.inner.recovered.insert(folder_id, ()).is_none();
        self.recover(&runtime, interrupted).await?;
        Ok(runtime)
    }

    async fn start_monitor(&self, runtime: &Arc<FolderRuntime>) -> Result<(), BatchProcessorError> {
        let folder_id = runtime.folder.id;
        let mut active = runtime.monitor.lock().await;
        if active.is_some() {
            return Ok(());
        }

        let location = runtime.location.clone();
        match self.inner.watched.entry(location.clone()) {
            Entry::Occupied(owner) if *owner.get() != folder_id => {
                return Err(BatchProcessorError::MonitorConflict {
                    location,
                    folder_id: *owner.get(),
                });
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(folder_id);
            }
        }

        let started = async {
            let scope = folder_scope(folder_id);
            let provider = self
                .inner
                .factory
                .create_monitor(&scope, &runtime.folder.monitor)?;
            let target = MonitorTarget {
                folder_id,
                root: runtime.folder.storage.root(),
                local_path: match &runtime.folder.storage {
                    StorageConfig::Local { path } => Some(PathBuf::from(path)),
                    _ => None,
                },
                storage: Arc::clone(&runtime.storage),
            };
            let handle = provider
                .start_monitoring(target, self.inner.discovery_tx.clone())
                .await?;
            Ok::<_, BatchProcessorError>(ActiveMonitor { provider, handle })
        }
        .await;

        match started {
            Ok(monitor) => {
                tracing::info!(
                    folder_id = %folder_id.as_uuid(),
                    monitor = %monitor.provider.kind(),
                    location = %location,
                    "Folder monitoring started"
                );
                *active = Some(monitor);
                Ok(())
            }
            Err(e) => {
                self.inner.watched.remove(&location);
                Err(e)
            }
        }
    }

    async fn stop_monitor(&self, runtime: &FolderRuntime) -> bool {
        let folder_id = runtime.folder.id;
        let Some(active) = runtime.monitor.lock().await.take() else {
            return false;
        };
        if let Err(e) = active.provider.stop_monitoring(active.handle).await {
            tracing::warn!(folder_id = %folder_id.as_uuid(), error = %e, "Monitor did not stop cleanly");
        }
        self.inner.registry.unregister(
            ProviderKind::Monitor,
            active.provider.kind().as_str(),
            &folder_scope(folder_id),
        );
        self.inner
            .watched
            .remove_if(&runtime.location, |_, owner| *owner == folder_id);
        tracing::info!(folder_id = %folder_id.as_uuid(), "Folder monitoring stopped");
        true
    }

    async fn run_discovery_loop(&self, mut rx: mpsc::Receiver<DiscoveryEvent>) {
        tracing::info!("Discovery loop started");
        loop {
            tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => {
                        let folder_id = event.folder_id;
                        if let Err(e) = self.handle_discovery(event).await {
                            tracing::error!(
                                folder_id = %folder_id.as_uuid(),
                                error = %e,
                                "Discovery handling failed"
                            );
                        }
                    }
                    None => break,
                },
            }
        }
        tracing::info!("Discovery loop stopped");
    }

    async fn run_worker(&self, runtime: Arc<FolderRuntime>, mut rx: mpsc::Receiver<FileRecordId>) {
        let folder_id = runtime.folder.id;
        tracing::debug!(folder_id = %folder_id.as_uuid(), "Folder worker started");
        loop {
            let record_id = tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                _ = runtime.worker_stop.cancelled() => break,
                next = rx.recv() => match next {
                    Some(record_id) => record_id,
                    None => break,
                },
            };
            // Undispatched ids stay `queued` in storage and are recovered on restart.
            let permit = tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                _ = runtime.worker_stop.cancelled() => break,
                permit = Arc::clone(&runtime.semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let span = tracing::info_span!(
                "file_record",
                folder_id = %folder_id.as_uuid(),
                record_id = %record_id.as_uuid(),
            );
            let this = self.clone();
            let runtime = Arc::clone(&runtime);
            self.inner.tasks.spawn(
                async move {
                    let _permit = permit;
                    this.process_record(&runtime, record_id).await;
                }
                .instrument(span),
            );
        }
        tracing::debug!(folder_id = %folder_id.as_uuid(), "Folder worker stopped");
    }

    async fn enqueue(&self, folder_id: FolderId, record_id: FileRecordId) -> bool {
        let queue = self.runtime(folder_id).map(|rt| rt.queue.clone());
        match queue {
            Some(queue) if queue.send(record_id).await.is_ok() => true,
            _ => {
                tracing::warn!(
                    folder_id = %folder_id.as_uuid(),
                    record_id = %record_id.as_uuid(),
                    "Folder not running, record stays queued"
                );
                false
            }
        }
    }

    fn schedule(&self, folder_id: FolderId, record_id: FileRecordId, delay: Duration) {
        let this = self.clone();
        self.inner.tasks.spawn(async move {
            tokio::select! {
                _ = this.inner.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    this.enqueue(folder_id, record_id).await;
                }
            }
        });
    }

    async fn process_record(&self, runtime: &Arc<FolderRuntime>, record_id: FileRecordId) {
        let mut record = match self.inner.records.get_by_id(record_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!("Queued record no longer exists");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load queued record");
                return;
            }
        };

        if self.inner.cancelled.contains_key(&record.batch_job_id) {
            self.cancel_record(record).await;
            return;
        }
        if !matches!(record.status, FileStatus::Queued | FileStatus::Retrying) {
            tracing::debug!(status = %record.status, "Record is not waiting for processing");
            return;
        }
        if let Err(e) = self
            .inner
            .tracker
            .transition(&mut record, FileStatus::Processing, None)
            .await
        {
            log_transition_failure(&record, &e);
            return;
        }

        match self.run_pipeline(runtime, &record).await {
            Ok(outcome) => self.complete(record, outcome).await,
            Err(failure) => self.fail(runtime, record, failure).await,
        }
    }

    async fn run_pipeline(
        &self,
        runtime: &FolderRuntime,
        record: &FileRecord,
    ) -> Result<AnalysisOutcome, Failure> {
        let work_dir = self
            .inner
            .settings
            .work_dir
            .join(record.id.as_uuid().to_string());
        let local_path = work_dir.join(&record.file_name);

        let result = async {
            tokio::fs::create_dir_all(&work_dir)
                .await
                .map_err(|e| Failure::system(format!("cannot create working directory: {e}")))?;
            let bytes = runtime
                .download(&record.file_path, &local_path)
                .await
                .map_err(Failure::from_storage)?;
            tracing::debug!(bytes, "Working copy downloaded");
            let limit = runtime.processing.max_file_size_bytes;
            if bytes > limit {
                return Err(Failure::terminal(
                    FileError::new(
                        ErrorCode::FileTooLarge,
                        format!(
                            "{} downloaded as {bytes} bytes, limit is {limit} bytes",
                            record.file_name
                        ),
                    )
                    .with_details(json!({
                        "listed_size": record.file_size,
                        "downloaded_size": bytes,
                        "max_file_size": limit,
                    })),
                ));
            }

            let metadata = AnalysisMetadata {
                record_id: record.id,
                folder_id: record.folder_id,
                batch_job_id: record.batch_job_id,
                file_name: record.file_name.clone(),
                file_size: record.file_size,
            };
            self.inner
                .analysis
                .analyze(&local_path, &metadata)
                .await
                .map_err(Failure::from_analysis)
        }
        .await;

        match tokio::fs::remove_dir_all(&work_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                error = %e,
                path = %work_dir.display(),
                "Failed to remove working copy"
            ),
        }
        result
    }

    async fn complete(&self, mut record: FileRecord, outcome: AnalysisOutcome) {
        record.analysis_result_id = Some(outcome.result_id);
        if let Err(e) = self
            .inner
            .tracker
            .transition(&mut record, FileStatus::Completed, None)
            .await
        {
            log_transition_failure(&record, &e);
            return;
        }
        tracing::info!(
            result_id = %outcome.result_id,
            confidence = outcome.confidence,
            retry_count = record.retry_count,
            "File processed"
        );
        self.settle(record.batch_job_id, FileOutcome::Completed).await;
        self.notify(
            Notification::new(
                NotificationCondition::FileCompleted,
                Severity::Info,
                format!("Processed {}", record.file_name),
                format!(
                    "{} was analysed with confidence {:.2}",
                    record.file_name, outcome.confidence
                ),
            )
            .for_folder(record.folder_id)
            .for_job(record.batch_job_id)
            .for_file(record.id, record.file_name.clone()),
        );
    }

    async fn fail(&self, runtime: &FolderRuntime, mut record: FileRecord, failure: Failure) {
        let code = failure.error.code;
        let guard = self.inner.job_lock.lock().await;
        if let Err(e) = self
            .inner
            .tracker
            .transition(&mut record, FileStatus::Failed, Some(failure.error))
            .await
        {
            log_transition_failure(&record, &e);
            return;
        }

        let cancelled = self.inner.cancelled.contains_key(&record.batch_job_id);
        if failure.retryable && record.has_retry_budget() && !cancelled {
            let delay = RetryPolicy::for_files(&runtime.processing).delay_for(record.retry_count + 1);
            record.retry_count += 1;
            record.next_retry_at = Some(
                Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero()),
            );
            match self
                .inner
                .tracker
                .transition(&mut record, FileStatus::Retrying, None)
                .await
            {
                Ok(()) => {
                    drop(guard);
                    tracing::warn!(
                        error_code = %code,
                        retry_count = record.retry_count,
                        max_retries = record.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "File failed, retry scheduled"
                    );
                    self.schedule(record.folder_id, record.id, delay);
                    return;
                }
                Err(e) => {
                    record.retry_count -= 1;
                    log_transition_failure(&record, &e);
                }
            }
        }

        self.settle_locked(record.batch_job_id, FileOutcome::Failed)
            .await;
        drop(guard);

        let exhausted = failure.retryable && !cancelled;
        let severity = if exhausted || code == ErrorCode::SystemError {
            Severity::Critical
        } else {
            Severity::Warning
        };
        tracing::error!(
            error_code = %code,
            retry_count = record.retry_count,
            exhausted,
            "File failed permanently"
        );
        let message = match &record.error {
            Some(error) if exhausted => format!(
                "{} after {} retries: {}",
                code, record.retry_count, error.message
            ),
            Some(error) => format!("{}: {}", code, error.message),
            None => code.to_string(),
        };
        self.notify(
            Notification::new(
                NotificationCondition::FileFailed,
                severity,
                format!("Failed to process {}", record.file_name),
                message,
            )
            .for_folder(record.folder_id)
            .for_job(record.batch_job_id)
            .for_file(record.id, record.file_name.clone())
            .with_error_code(code),
        );
    }

    async fn skip(&self, mut record: FileRecord, error: FileError) -> Result<(), BatchProcessorError> {
        let code = error.code;
        let message = error.message.clone();
        self.inner
            .tracker
            .transition(&mut record, FileStatus::Skipped, Some(error))
            .await?;
        tracing::info!(
            record_id = %record.id.as_uuid(),
            file_name = %record.file_name,
            error_code = %code,
            "File skipped"
        );
        self.settle(record.batch_job_id, FileOutcome::Skipped).await;
        self.notify(
            Notification::new(
                NotificationCondition::FileSkipped,
                Severity::Warning,
                format!("Skipped {}", record.file_name),
                message,
            )
            .for_folder(record.folder_id)
            .for_job(record.batch_job_id)
            .for_file(record.id, record.file_name.clone())
            .with_error_code(code),
        );
        Ok(())
    }

    async fn cancel_record(&self, mut record: FileRecord) {
        let (to, outcome) = match record.status {
            FileStatus::Discovered | FileStatus::Queued => (FileStatus::Skipped, FileOutcome::Skipped),
            FileStatus::Retrying => (FileStatus::Failed, FileOutcome::Failed),
            _ => return,
        };
        let _guard = self.inner.job_lock.lock().await;
        let error = FileError::new(ErrorCode::Cancelled, "batch job was cancelled");
        match self.inner.tracker.transition(&mut record, to, Some(error)).await {
            Ok(()) => self.settle_locked(record.batch_job_id, outcome).await,
            Err(e) => log_transition_failure(&record, &e),
        }
    }

    /// Static checks plus duplicate detection. `Some` means the file must be
    /// skipped with that error.
    async fn admit(
        &self,
        runtime: &FolderRuntime,
        record: &FileRecord,
        file: &RemoteFile,
        signatures: &mut HashSet<(String, u64)>,
    ) -> Result<Option<FileError>, BatchProcessorError> {
        if let Err(error) = runtime.validator.check(file) {
            return Ok(Some(error));
        }

        let duplicate = |original: &str| {
            FileError::new(
                ErrorCode::DuplicateFile,
                format!("{} duplicates {}", file.path, original),
            )
            .with_details(json!({ "duplicate_of": original }))
        };
        if !signatures.insert((file.name.clone(), file.size)) {
            return Ok(Some(duplicate("another file in the same batch")));
        }
        let twins = self
            .inner
            .records
            .list(&FileRecordFilter {
                folder_id: Some(record.folder_id),
                file_name: Some(file.name.clone()),
                file_size: Some(file.size),
                ..FileRecordFilter::default()
            })
            .await?;
        let original = twins.iter().find(|twin| {
            twin.id != record.id
                && twin.file_path != record.file_path
                && !matches!(twin.status, FileStatus::Skipped | FileStatus::Failed)
        });
        Ok(original.map(|twin| duplicate(&twin.file_path)))
    }

    async fn requeue(
        &self,
        folder_id: FolderId,
        records: Vec<FileRecord>,
        reset_retry_count: bool,
    ) -> Result<BatchJob, BatchProcessorError> {
        if self.runtime(folder_id).is_none() {
            self.create_runtime(folder_id).await?;
        }

        let guard = self.inner.job_lock.lock().await;
        let mut job = BatchJob::new(folder_id, BatchTrigger::Retry, records.len() as u32);
        job.start();
        self.inner.jobs.create(&job).await?;

        let mut moved = Vec::new();
        for candidate in records {
            let Some(mut record) = self.inner.records.get_by_id(candidate.id).await? else {
                continue;
            };
            if record.status != FileStatus::Failed {
                continue;
            }
            let previous_job = record.batch_job_id;
            record.batch_job_id = job.id;
            record.retry_count = if reset_retry_count {
                0
            } else {
                record.retry_count + 1
            };
            record.next_retry_at = None;
            match self
                .inner
                .tracker
                .transition(&mut record, FileStatus::Retrying, None)
                .await
            {
                Ok(()) => {
                    self.release_from(previous_job).await;
                    moved.push(record.id);
                }
                Err(e) => log_transition_failure(&record, &e),
            }
        }

        job.total_files = moved.len() as u32;
        self.persist_job(&mut job).await;
        drop(guard);

        tracing::info!(
            batch_job_id = %job.id.as_uuid(),
            files = moved.len(),
            reset_retry_count,
            "Retry batch started"
        );
        for record_id in moved {
            self.enqueue(folder_id, record_id).await;
        }
        Ok(job)
    }

    /// Caller holds `job_lock`.
    async fn release_from(&self, job_id: BatchJobId) {
        match self.inner.jobs.get_by_id(job_id).await {
            Ok(Some(mut job)) => {
                job.release_failed();
                match self.inner.jobs.update(&job).await {
                    Ok(()) => self.inner.tracker.publish(StatusEvent::job_updated(&job)),
                    Err(e) => tracing::error!(error = %e, "Failed to update released batch job"),
                }
            }
            Ok(None) => tracing::warn!(batch_job_id = %job_id.as_uuid(), "Batch job vanished"),
            Err(e) => tracing::error!(error = %e, "Failed to load batch job"),
        }
    }

    async fn settle(&self, job_id: BatchJobId, outcome: FileOutcome) {
        let _guard = self.inner.job_lock.lock().await;
        self.settle_locked(job_id, outcome).await;
    }

    /// Caller holds `job_lock`.
    async fn settle_locked(&self, job_id: BatchJobId, outcome: FileOutcome) {
        match self.inner.jobs.get_by_id(job_id).await {
            Ok(Some(mut job)) => {
                job.record_outcome(outcome);
                self.persist_job(&mut job).await;
            }
            Ok(None) => tracing::warn!(batch_job_id = %job_id.as_uuid(), "Batch job vanished"),
            Err(e) => tracing::error!(error = %e, "Failed to load batch job"),
        }
    }

    /// Caller holds `job_lock`. Finishes the job once every file settled.
    async fn persist_job(&self, job: &mut BatchJob) {
        let finished = job.is_settled() && !job.status.is_terminal();
        if finished {
            let cancelled = self.inner.cancelled.remove(&job.id).is_some();
            job.finish(cancelled);
        }
        if let Err(e) = self.inner.jobs.update(job).await {
            tracing::error!(batch_job_id = %job.id.as_uuid(), error = %e, "Failed to persist batch job");
            return;
        }
        self.inner.tracker.publish(StatusEvent::job_updated(job));
        if finished {
            tracing::info!(
                batch_job_id = %job.id.as_uuid(),
                status = %job.status,
                processed = job.processed_files,
                failed = job.failed_files,
                skipped = job.skipped_files,
                "Batch job finished"
            );
            self.notify(job_notification(job));
        }
    }

    async fn recover(
        &self,
        runtime: &Arc<FolderRuntime>,
        interrupted: bool,
    ) -> Result<(), BatchProcessorError> {
        let folder_id = runtime.folder.id;
        let mut statuses = vec![FileStatus::Discovered, FileStatus::Queued, FileStatus::Retrying];
        if interrupted {
            statuses.push(FileStatus::Processing);
        }
        let stale = self
            .inner
            .records
            .list(&FileRecordFilter::for_folder(folder_id).with_statuses(&statuses))
            .await?;
        if stale.is_empty() {
            return Ok(());
        }
        tracing::info!(
            folder_id = %folder_id.as_uuid(),
            records = stale.len(),
            "Recovering unfinished records"
        );

        let mut signatures = HashSet::new();
        for mut record in stale {
            match record.status {
                FileStatus::Processing => {
                    let failure = Failure::system("processing was interrupted by a restart");
                    self.fail(runtime, record, failure).await;
                }
                FileStatus::Discovered => {
                    let file = RemoteFile::new(record.file_path.clone(), record.file_size);
                    match self.admit(runtime, &record, &file, &mut signatures).await? {
                        None => {
                            self.inner
                                .tracker
                                .transition(&mut record, FileStatus::Queued, None)
                                .await?;
                            self.enqueue(folder_id, record.id).await;
                        }
                        Some(error) => self.skip(record, error).await?,
                    }
                }
                FileStatus::Queued => {
                    self.enqueue(folder_id, record.id).await;
                }
                FileStatus::Retrying => {
                    let delay = record
                        .next_retry_at
                        .and_then(|at| (at - Utc::now()).to_std().ok())
                        .unwrap_or_default();
                    self.schedule(folder_id, record.id, delay);
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn job_notification(job: &BatchJob) -> Notification {
    let (condition, severity) = match job.status {
        BatchJobStatus::Failed => (NotificationCondition::BatchFailed, Severity::Critical),
        BatchJobStatus::Cancelled => (NotificationCondition::BatchCancelled, Severity::Warning),
        _ if job.failed_files > 0 => (NotificationCondition::BatchCompleted, Severity::Warning),
        _ => (NotificationCondition::BatchCompleted, Severity::Info),
    };
    Notification::new(
        condition,
        severity,
        format!("Batch {}", job.status),
        format!(
            "{} of {} file(s) processed, {} failed, {} skipped",
            job.processed_files, job.total_files, job.failed_files, job.skipped_files
        ),
    )
    .for_folder(job.folder_id)
    .for_job(job.id)
}

/// Local folders are keyed by their canonical path so different spellings
/// of one directory collide. Unresolvable paths keep the lexical key.
async fn resolve_location(storage: &StorageConfig) -> String {
    if let StorageConfig::Local { path } = storage {
        if let Ok(canonical) = tokio::fs::canonicalize(path.trim()).await {
            return format!("local:{}", canonical.display());
        }
    }
    storage.location_key()
}

fn log_transition_failure(record: &FileRecord, error: &TransitionError) {
    match error {
        TransitionError::Conflict(_) => tracing::debug!(
            record_id = %record.id.as_uuid(),
            "Record changed concurrently, leaving it to the other writer"
        ),
        _ => tracing::error!(
            record_id = %record.id.as_uuid(),
            status = %record.status,
            error = %error,
            "File status transition failed"
        ),
    }
}
