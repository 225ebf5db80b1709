use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::Instant;

use callbatch::application::ports::{
    MonitorError, MonitorHandle, MonitorProvider, MonitorTarget, StorageProvider,
};
use callbatch::domain::{
    DiscoveryEvent, DiscoverySource, FolderId, MonitorConfig, MonitorKind, RemoteFile,
};
use callbatch::infrastructure::monitoring::{
    CloudEventMonitor, Debouncer, EventMonitor, ListingTracker, PollingMonitor,
};
use callbatch::infrastructure::storage::ObjectStorageProvider;

use crate::helpers::FakeStorage;

fn local_target(dir: &TempDir) -> MonitorTarget {
    let storage: Arc<dyn StorageProvider> =
        Arc::new(ObjectStorageProvider::local(dir.path()).unwrap());
    MonitorTarget {
        folder_id: FolderId::new(),
        root: String::new(),
        local_path: Some(dir.path().to_path_buf()),
        storage,
    }
}

async fn next_event(rx: &mut mpsc::Receiver<DiscoveryEvent>) -> DiscoveryEvent {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no discovery event in time")
        .expect("discovery channel closed")
}

fn names(event: &DiscoveryEvent) -> Vec<String> {
    event.files.iter().map(|f| f.path.clone()).collect()
}

#[test]
fn given_repeated_sightings_when_draining_then_each_key_once_after_quiet_window() {
    let start = Instant::now();
    let mut debouncer: Debouncer<u32> = Debouncer::new(Duration::from_millis(500));
    debouncer.record("b.mp3", 1, start);
    debouncer.record("a.mp3", 1, start);
    debouncer.record("b.mp3", 2, start + Duration::from_millis(300));

    assert_eq!(debouncer.len(), 2);
    assert_eq!(debouncer.next_deadline(), Some(start + Duration::from_millis(500)));
    assert_eq!(
        debouncer.drain_ready(start + Duration::from_millis(500)),
        vec![("a.mp3".to_string(), 1)]
    );
    assert!(debouncer.drain_ready(start + Duration::from_millis(700)).is_empty());
    assert_eq!(
        debouncer.drain_ready(start + Duration::from_millis(800)),
        vec![("b.mp3".to_string(), 2)]
    );
    assert!(debouncer.is_empty());
    assert_eq!(debouncer.next_deadline(), None);
}

#[tokio::test]
async fn given_polling_monitor_when_files_appear_then_only_new_top_level_files_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("first.mp3"), b"ID3").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/deep.mp3"), b"ID3").unwrap();
    let monitor = PollingMonitor::new(MonitorConfig {
        scan_interval_secs: 1,
        ..MonitorConfig::new(MonitorKind::Polling)
    });
    let (tx, mut rx) = mpsc::channel(8);

    let handle = monitor.start_monitoring(local_target(&dir), tx).await.unwrap();
    let initial = next_event(&mut rx).await;
    fs::write(dir.path().join("second.wav"), b"RIFF").unwrap();
    let later = next_event(&mut rx).await;

    assert_eq!(initial.source, DiscoverySource::Poll);
    assert_eq!(names(&initial), vec!["first.mp3"]);
    assert_eq!(names(&later), vec!["second.wav"]);
    monitor.stop_monitoring(handle).await.unwrap();
}

#[test]
fn given_growing_upload_when_listed_then_reported_only_once_size_settles() {
    let mut tracker = ListingTracker::new("", false);

    let first = tracker.observe(vec![RemoteFile::new("big.wav", 100 * 1024 * 1024)]);
    let growing = tracker.observe(vec![RemoteFile::new("big.wav", 600 * 1024 * 1024)]);
    let settled = tracker.observe(vec![RemoteFile::new("big.wav", 600 * 1024 * 1024)]);
    let again = tracker.observe(vec![RemoteFile::new("big.wav", 600 * 1024 * 1024)]);

    assert!(first.is_empty());
    assert!(growing.is_empty());
    assert_eq!(settled, vec![RemoteFile::new("big.wav", 600 * 1024 * 1024)]);
    assert!(again.is_empty());
}

#[test]
fn given_touched_file_when_listed_then_modification_time_must_settle_too() {
    let mut tracker = ListingTracker::new("", false);
    let earlier = chrono::Utc::now() - chrono::Duration::seconds(5);
    let later = chrono::Utc::now();

    tracker.observe(vec![RemoteFile::new("call.mp3", 10).with_last_modified(earlier)]);
    let touched = tracker.observe(vec![RemoteFile::new("call.mp3", 10).with_last_modified(later)]);
    let settled = tracker.observe(vec![RemoteFile::new("call.mp3", 10).with_last_modified(later)]);

    assert!(touched.is_empty());
    assert_eq!(settled.len(), 1);
}

#[test]
fn given_deleted_then_recreated_path_when_listed_then_reported_again() {
    let mut tracker = ListingTracker::new("inbound", false);
    let listing = || {
        vec![
            RemoteFile::new("inbound/call.mp3", 10),
            RemoteFile::new("inbound/archive/old.mp3", 10),
        ]
    };

    tracker.observe(listing());
    let reported = tracker.observe(listing());
    tracker.observe(vec![]);
    tracker.observe(listing());
    let recreated = tracker.observe(listing());

    assert_eq!(reported, vec![RemoteFile::new("inbound/call.mp3", 10)]);
    assert_eq!(recreated, reported);
}

#[tokio::test]
async fn given_recursive_polling_when_started_then_nested_files_included() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/deep.mp3"), b"ID3").unwrap();
    let monitor = PollingMonitor::new(MonitorConfig {
        scan_interval_secs: 1,
        recursive: true,
        ..MonitorConfig::new(MonitorKind::Polling)
    });
    let (tx, mut rx) = mpsc::channel(8);

    monitor.start_monitoring(local_target(&dir), tx).await.unwrap();

    assert_eq!(names(&next_event(&mut rx).await), vec!["nested/deep.mp3"]);
    monitor.stop_all().await;
}

#[tokio::test]
async fn given_stopped_watch_when_stopping_again_then_unknown_handle() {
    let dir = TempDir::new().unwrap();
    let monitor = PollingMonitor::new(MonitorConfig::new(MonitorKind::Polling));
    let (tx, _rx) = mpsc::channel(8);
    let handle = monitor.start_monitoring(local_target(&dir), tx).await.unwrap();

    monitor.stop_monitoring(handle).await.unwrap();
    let error = monitor.stop_monitoring(handle).await.unwrap_err();

    assert!(matches!(error, MonitorError::UnknownHandle(id) if id == handle.id));
}

#[tokio::test]
async fn given_polling_monitor_when_pushed_then_push_unsupported() {
    let monitor = PollingMonitor::new(MonitorConfig::new(MonitorKind::Polling));

    let error = monitor
        .push_event(MonitorHandle::new(FolderId::new()), vec![])
        .await
        .unwrap_err();

    assert!(matches!(error, MonitorError::PushUnsupported(MonitorKind::Polling)));
}

#[tokio::test]
async fn given_cloud_pushes_for_same_object_when_debounced_then_one_discovery() {
    let monitor = CloudEventMonitor::new(MonitorConfig {
        debounce_ms: 100,
        ..MonitorConfig::new(MonitorKind::CloudEvents)
    });
    let (tx, mut rx) = mpsc::channel(8);
    let target = MonitorTarget {
        folder_id: FolderId::new(),
        root: "inbound".into(),
        local_path: None,
        storage: Arc::new(FakeStorage::default()),
    };
    let folder_id = target.folder_id;
    let handle = monitor.start_monitoring(target, tx).await.unwrap();

    monitor
        .push_event(
            handle,
            vec![
                RemoteFile::new("inbound/call-2.mp3", 10),
                RemoteFile::new("elsewhere/call-9.mp3", 10),
                RemoteFile::new("inbound/archive/call-0.mp3", 10),
            ],
        )
        .await
        .unwrap();
    monitor
        .push_event(
            handle,
            vec![
                RemoteFile::new("inbound/call-2.mp3", 20),
                RemoteFile::new("inbound/call-1.mp3", 5),
            ],
        )
        .await
        .unwrap();
    let event = next_event(&mut rx).await;

    assert_eq!(event.folder_id, folder_id);
    assert_eq!(event.source, DiscoverySource::CloudEvent);
    assert_eq!(names(&event), vec!["inbound/call-1.mp3", "inbound/call-2.mp3"]);
    assert_eq!(event.files[1].size, 20);
    monitor.stop_monitoring(handle).await.unwrap();
}

#[tokio::test]
async fn given_stopped_cloud_watch_when_pushing_then_unknown_handle() {
    let monitor = CloudEventMonitor::new(MonitorConfig::new(MonitorKind::CloudEvents));
    let (tx, _rx) = mpsc::channel(8);
    let target = MonitorTarget {
        folder_id: FolderId::new(),
        root: String::new(),
        local_path: None,
        storage: Arc::new(FakeStorage::default()),
    };
    let handle = monitor.start_monitoring(target, tx).await.unwrap();
    monitor.stop_monitoring(handle).await.unwrap();

    let error = monitor
        .push_event(handle, vec![RemoteFile::new("call.mp3", 1)])
        .await
        .unwrap_err();

    assert!(matches!(error, MonitorError::UnknownHandle(_)));
}

#[tokio::test]
async fn given_event_monitor_when_file_written_then_existing_and_new_files_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("existing.mp3"), b"ID3").unwrap();
    let monitor = EventMonitor::new(MonitorConfig {
        debounce_ms: 100,
        ..MonitorConfig::new(MonitorKind::Events)
    });
    let (tx, mut rx) = mpsc::channel(8);
    let handle = monitor.start_monitoring(local_target(&dir), tx).await.unwrap();

    let initial = next_event(&mut rx).await;
    fs::write(dir.path().join("fresh.wav"), b"RIFF....").unwrap();
    let fresh = loop {
        let event = next_event(&mut rx).await;
        if let Some(file) = event.files.into_iter().find(|f| f.path == "fresh.wav") {
            break file;
        }
    };

    assert_eq!(names(&initial), vec!["existing.mp3"]);
    assert_eq!(fresh.size, 8);
    monitor.stop_monitoring(handle).await.unwrap();
}

#[tokio::test]
async fn given_event_monitor_without_local_path_when_starting_then_start_failed() {
    let monitor = EventMonitor::new(MonitorConfig::new(MonitorKind::Events));
    let (tx, _rx) = mpsc::channel(8);
    let target = MonitorTarget {
        folder_id: FolderId::new(),
        root: String::new(),
        local_path: None,
        storage: Arc::new(FakeStorage::default()),
    };

    let error = monitor.start_monitoring(target, tx).await.unwrap_err();

    assert!(matches!(error, MonitorError::StartFailed(_)));
}
