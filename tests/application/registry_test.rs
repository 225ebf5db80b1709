use std::sync::Arc;

use callbatch::application::ports::{MonitorProvider, ProviderError, StorageProvider};
use callbatch::application::services::{ProviderRegistry, folder_scope};
use callbatch::domain::{FolderId, ProviderKind};

use crate::helpers::{FakeStorage, IdleMonitor};

#[test]
fn given_registered_storage_when_looked_up_then_same_instance() {
    let registry = ProviderRegistry::new();
    let scope = folder_scope(FolderId::new());
    let storage: Arc<dyn StorageProvider> = Arc::new(FakeStorage::default());

    registry.register_storage(&scope, Arc::clone(&storage));

    let found = registry.storage("local", &scope).unwrap();
    assert!(Arc::ptr_eq(&found, &storage));
}

#[test]
fn given_unknown_scope_when_looked_up_then_provider_not_found() {
    let registry = ProviderRegistry::new();

    let error = registry.monitor("polling", "folder:missing").err().unwrap();

    assert!(matches!(
        error,
        ProviderError::ProviderNotFound {
            kind: ProviderKind::Monitor,
            ..
        }
    ));
}

#[test]
fn given_providers_in_several_scopes_when_listed_then_sorted_and_filterable() {
    let registry = ProviderRegistry::new();
    let storage: Arc<dyn StorageProvider> = Arc::new(FakeStorage::default());
    let monitor: Arc<dyn MonitorProvider> = Arc::new(IdleMonitor::default());
    registry.register_storage("folder:b", Arc::clone(&storage));
    registry.register_storage("folder:a", storage);
    registry.register_monitor("folder:a", monitor);

    let all = registry.list();

    assert_eq!(all.len(), 3);
    assert_eq!(all[0].kind, ProviderKind::Monitor);
    assert_eq!(all[1].scope, "folder:a");
    assert_eq!(all[2].scope, "folder:b");
    assert_eq!(registry.list_by_type(ProviderKind::Storage, "local").len(), 2);
    assert!(registry.list_by_type(ProviderKind::Storage, "s3").is_empty());
}

#[tokio::test]
async fn given_scope_when_torn_down_then_only_that_scope_removed() {
    let registry = ProviderRegistry::new();
    let storage: Arc<dyn StorageProvider> = Arc::new(FakeStorage::default());
    let monitor: Arc<dyn MonitorProvider> = Arc::new(IdleMonitor::default());
    registry.register_storage("folder:a", Arc::clone(&storage));
    registry.register_monitor("folder:a", monitor);
    registry.register_storage("folder:b", storage);

    let removed = registry.teardown_scope("folder:a").await;

    assert_eq!(removed, 2);
    assert_eq!(registry.len(), 1);
    assert!(registry.storage("local", "folder:b").is_ok());
}

#[test]
fn given_registered_provider_when_unregistered_then_gone() {
    let registry = ProviderRegistry::new();
    registry.register_storage("folder:a", Arc::new(FakeStorage::default()));

    assert!(registry.unregister(ProviderKind::Storage, "local", "folder:a"));
    assert!(!registry.unregister(ProviderKind::Storage, "local", "folder:a"));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn given_populated_registry_when_shut_down_then_empty() {
    let registry = ProviderRegistry::new();
    registry.register_storage("folder:a", Arc::new(FakeStorage::default()));
    registry.register_monitor("folder:a", Arc::new(IdleMonitor::default()));

    registry.shutdown().await;

    assert!(registry.is_empty());
}
