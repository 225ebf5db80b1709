use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use callbatch::application::ports::{
    BatchJobRepository, FileRecordFilter, FileRecordRepository, FolderRepository,
    NotificationConfigRepository, ProviderFactory,
};
use callbatch::application::services::{
    BatchProcessor, DiscoverySummary, NotificationDispatcher, ProcessorSettings, ProviderRegistry,
    RetryPolicy,
};
use callbatch::domain::{
    BatchJob, BatchJobId, DiscoveryEvent, DiscoverySource, FileRecord, FolderConfig, FolderId,
    MonitorConfig, MonitorKind, NotificationChannelConfig, NotificationCondition,
    NotificationConfig, ProcessingOverrides, RemoteFile, StorageConfig,
};
use callbatch::infrastructure::persistence::{
    InMemoryBatchJobRepository, InMemoryFileRecordRepository, InMemoryFolderRepository,
    InMemoryNotificationConfigRepository,
};
use callbatch::infrastructure::providers::DefaultProviderFactory;

use super::fakes::{FakeFactory, FakeStorage, IdleMonitor, RecordingNotifier, ScriptedAnalysis};

/// A processor wired to in-memory repositories and fake providers.
pub struct Harness {
    pub processor: BatchProcessor,
    pub dispatcher: NotificationDispatcher,
    pub registry: Arc<ProviderRegistry>,
    pub folders: Arc<InMemoryFolderRepository>,
    pub jobs: Arc<InMemoryBatchJobRepository>,
    pub records: Arc<InMemoryFileRecordRepository>,
    pub notification_configs: Arc<InMemoryNotificationConfigRepository>,
    pub storage: Arc<FakeStorage>,
    pub monitor: Arc<IdleMonitor>,
    pub notifier: Arc<RecordingNotifier>,
    pub analysis: Arc<ScriptedAnalysis>,
    pub source_dir: TempDir,
    pub work_dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(ScriptedAnalysis::default(), RecordingNotifier::default(), false)
    }

    pub fn with_analysis(analysis: ScriptedAnalysis) -> Self {
        Self::build(analysis, RecordingNotifier::default(), false)
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self::build(ScriptedAnalysis::default(), notifier, false)
    }

    /// Notifications go through the real channel providers; storage and
    /// monitoring stay fake.
    pub fn with_real_notifiers() -> Self {
        Self::build(ScriptedAnalysis::default(), RecordingNotifier::default(), true)
    }

    fn build(analysis: ScriptedAnalysis, notifier: RecordingNotifier, real_notifiers: bool) -> Self {
        let registry = Arc::new(ProviderRegistry::new());
        let folders = Arc::new(InMemoryFolderRepository::default());
        let jobs = Arc::new(InMemoryBatchJobRepository::default());
        let records = Arc::new(InMemoryFileRecordRepository::default());
        let notification_configs = Arc::new(InMemoryNotificationConfigRepository::default());
        let storage = Arc::new(FakeStorage::default());
        let monitor = Arc::new(IdleMonitor::default());
        let notifier = Arc::new(notifier);
        let analysis = Arc::new(analysis);
        let source_dir = TempDir::new().unwrap();
        let work_dir = TempDir::new().unwrap();

        let factory = Arc::new(FakeFactory {
            registry: Arc::clone(&registry),
            storage: Arc::clone(&storage),
            monitor: Arc::clone(&monitor),
            notifier: Arc::clone(&notifier),
        });
        let notifier_factory: Arc<dyn ProviderFactory> = if real_notifiers {
            Arc::new(DefaultProviderFactory::new(Arc::clone(&registry)))
        } else {
            factory.clone()
        };
        let dispatcher = NotificationDispatcher::new(
            notification_configs.clone() as Arc<dyn NotificationConfigRepository>,
            notifier_factory,
            Arc::clone(&registry),
            RetryPolicy::fixed(2, Duration::from_millis(10)),
        );
        let settings = ProcessorSettings {
            work_dir: work_dir.path().to_path_buf(),
            shutdown_grace: Duration::from_secs(5),
            ..ProcessorSettings::default()
        };
        let processor = BatchProcessor::new(
            folders.clone() as Arc<dyn FolderRepository>,
            jobs.clone() as Arc<dyn BatchJobRepository>,
            records.clone() as Arc<dyn FileRecordRepository>,
            factory,
            Arc::clone(&registry),
            analysis.clone(),
            dispatcher.clone(),
            settings,
        );

        Self {
            processor,
            dispatcher,
            registry,
            folders,
            jobs,
            records,
            notification_configs,
            storage,
            monitor,
            notifier,
            analysis,
            source_dir,
            work_dir,
        }
    }

    /// Stores an active polling folder over the temp source directory
    /// without starting it.
    pub async fn add_folder(&self, processing: ProcessingOverrides) -> FolderConfig {
        let path = self.source_dir.path().to_string_lossy().into_owned();
        self.add_folder_at(&path, processing).await
    }

    pub async fn add_folder_at(&self, path: &str, processing: ProcessingOverrides) -> FolderConfig {
        let folder = FolderConfig::new(
            "Inbound calls".to_string(),
            StorageConfig::Local {
                path: path.to_string(),
            },
            MonitorConfig::new(MonitorKind::Polling),
            processing,
        );
        self.folders.create(&folder).await.unwrap();
        folder
    }

    pub async fn start_folder(&self, processing: ProcessingOverrides) -> FolderConfig {
        let folder = self.add_folder(processing).await;
        self.processor.start_folder(folder.id).await.unwrap();
        folder
    }

    /// Registers a webhook config listening to `conditions` on every folder.
    pub async fn subscribe(&self, conditions: &[NotificationCondition]) -> NotificationConfig {
        self.subscribe_webhook("http://localhost:9/hook", conditions).await
    }

    pub async fn subscribe_webhook(
        &self,
        url: &str,
        conditions: &[NotificationCondition],
    ) -> NotificationConfig {
        let config = NotificationConfig::new(
            "Ops hook".to_string(),
            NotificationChannelConfig::Webhook {
                url: url.to_string(),
                secret: None,
                headers: Default::default(),
                timeout_secs: 5,
            },
            conditions.to_vec(),
            None,
        );
        self.notification_configs.create(&config).await.unwrap();
        config
    }

    pub async fn discover(&self, folder_id: FolderId, files: Vec<RemoteFile>) -> DiscoverySummary {
        self.processor
            .handle_discovery(DiscoveryEvent::new(folder_id, files, DiscoverySource::Poll))
            .await
            .unwrap()
    }

    /// Polls until the job reaches a terminal status.
    pub async fn wait_for_job(&self, job_id: BatchJobId) -> BatchJob {
        tokio::time::timeout(Duration::from_secs(900), async {
            loop {
                let job = self.jobs.get_by_id(job_id).await.unwrap().unwrap();
                if job.status.is_terminal() {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("batch job did not finish in time")
    }

    pub async fn record_named(&self, folder_id: FolderId, file_name: &str) -> FileRecord {
        let filter = FileRecordFilter {
            file_name: Some(file_name.to_string()),
            ..FileRecordFilter::for_folder(folder_id)
        };
        self.records
            .list(&filter)
            .await
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("no record for {file_name}"))
    }

    pub async fn flush_notifications(&self) {
        assert!(
            self.dispatcher.flush(Duration::from_secs(30)).await,
            "notifications did not drain"
        );
    }
}

pub fn audio(path: &str, size: u64) -> RemoteFile {
    RemoteFile::new(path, size)
}
