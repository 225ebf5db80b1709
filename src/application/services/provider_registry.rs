use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::application::ports::{
    MonitorProvider, NotificationProvider, ProviderError, StorageProvider,
};
use crate::domain::{FolderId, NotificationConfigId, ProviderKind};

/// Scope under which a folder's storage and monitor instances live.
pub fn folder_scope(folder_id: FolderId) -> String {
    format!("folder:{}", folder_id.as_uuid())
}

/// Scope under which a notification config's provider instance lives.
pub fn notification_scope(config_id: NotificationConfigId) -> String {
    format!("notification:{}", config_id.as_uuid())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    pub kind: ProviderKind,
    pub type_name: String,
    pub scope: String,
}

impl ProviderKey {
    pub fn new(kind: ProviderKind, type_name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            scope: scope.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub kind: ProviderKind,
    #[serde(rename = "type")]
    pub type_name: String,
    pub scope: String,
    pub registered_at: DateTime<Utc>,
}

struct Entry<P: ?Sized> {
    provider: Arc<P>,
    registered_at: DateTime<Utc>,
}

impl<P: ?Sized> Entry<P> {
    fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            registered_at: Utc::now(),
        }
    }
}

/// Live provider instances keyed by kind, type and scope. Shared by the
/// factory (which registers) and the orchestrator (which looks up).
#[derive(Default)]
pub struct ProviderRegistry {
    storage: DashMap<ProviderKey, Entry<dyn StorageProvider>>,
    monitors: DashMap<ProviderKey, Entry<dyn MonitorProvider>>,
    notifiers: DashMap<ProviderKey, Entry<dyn NotificationProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_storage(&self, scope: &str, provider: Arc<dyn StorageProvider>) {
        let key = ProviderKey::new(ProviderKind::Storage, provider.kind().as_str(), scope);
        tracing::debug!(scope, type_name = %key.type_name, "Registering storage provider");
        self.storage.insert(key, Entry::new(provider));
    }

    pub fn register_monitor(&self, scope: &str, provider: Arc<dyn MonitorProvider>) {
        let key = ProviderKey::new(ProviderKind::Monitor, provider.kind().as_str(), scope);
        tracing::debug!(scope, type_name = %key.type_name, "Registering monitor provider");
        self.monitors.insert(key, Entry::new(provider));
    }

    pub fn register_notifier(&self, scope: &str, provider: Arc<dyn NotificationProvider>) {
        let key = ProviderKey::new(
            ProviderKind::Notification,
            provider.channel().as_str(),
            scope,
        );
        tracing::debug!(scope, type_name = %key.type_name, "Registering notification provider");
        self.notifiers.insert(key, Entry::new(provider));
    }

    pub fn storage(
        &self,
        type_name: &str,
        scope: &str,
    ) -> Result<Arc<dyn StorageProvider>, ProviderError> {
        let key = ProviderKey::new(ProviderKind::Storage, type_name, scope);
        self.storage
            .get(&key)
            .map(|entry| Arc::clone(&entry.provider))
            .ok_or_else(|| not_found(key))
    }

    pub fn monitor(
        &self,
        type_name: &str,
        scope: &str,
    ) -> Result<Arc<dyn MonitorProvider>, ProviderError> {
        let key = ProviderKey::new(ProviderKind::Monitor, type_name, scope);
        self.monitors
            .get(&key)
            .map(|entry| Arc::clone(&entry.provider))
            .ok_or_else(|| not_found(key))
    }

    pub fn notifier(
        &self,
        type_name: &str,
        scope: &str,
    ) -> Result<Arc<dyn NotificationProvider>, ProviderError> {
        let key = ProviderKey::new(ProviderKind::Notification, type_name, scope);
        self.notifiers
            .get(&key)
            .map(|entry| Arc::clone(&entry.provider))
            .ok_or_else(|| not_found(key))
    }

    /// Every live instance, sorted by kind, type and scope.
    pub fn list(&self) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<ProviderDescriptor> = self
            .storage
            .iter()
            .map(|e| describe(e.key(), e.registered_at))
            .chain(self.monitors.iter().map(|e| describe(e.key(), e.registered_at)))
            .chain(self.notifiers.iter().map(|e| describe(e.key(), e.registered_at)))
            .collect();
        descriptors.sort_by(|a, b| {
            (a.kind.as_str(), &a.type_name, &a.scope).cmp(&(b.kind.as_str(), &b.type_name, &b.scope))
        });
        descriptors
    }

    pub fn list_by_type(&self, kind: ProviderKind, type_name: &str) -> Vec<ProviderDescriptor> {
        self.list()
            .into_iter()
            .filter(|d| d.kind == kind && d.type_name == type_name)
            .collect()
    }

    /// Drops storage and notification instances for `scope` and stops and
    /// drops its monitors. Returns how many instances were removed.
    pub async fn teardown_scope(&self, scope: &str) -> usize {
        let monitors: Vec<Arc<dyn MonitorProvider>> = self
            .monitors
            .iter()
            .filter(|e| e.key().scope == scope)
            .map(|e| Arc::clone(&e.provider))
            .collect();
        for monitor in &monitors {
            monitor.stop_all().await;
        }

        let before = self.len();
        self.storage.retain(|key, _| key.scope != scope);
        self.monitors.retain(|key, _| key.scope != scope);
        self.notifiers.retain(|key, _| key.scope != scope);
        let removed = before - self.len();
        if removed > 0 {
            tracing::debug!(scope, removed, "Provider scope torn down");
        }
        removed
    }

    pub fn unregister(&self, kind: ProviderKind, type_name: &str, scope: &str) -> bool {
        let key = ProviderKey::new(kind, type_name, scope);
        match kind {
            ProviderKind::Storage => self.storage.remove(&key).is_some(),
            ProviderKind::Monitor => self.monitors.remove(&key).is_some(),
            ProviderKind::Notification => self.notifiers.remove(&key).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len() + self.monitors.len() + self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops every monitor and empties the registry.
    pub async fn shutdown(&self) {
        let monitors: Vec<Arc<dyn MonitorProvider>> = self
            .monitors
            .iter()
            .map(|e| Arc::clone(&e.provider))
            .collect();
        for monitor in monitors {
            monitor.stop_all().await;
        }
        self.storage.clear();
        self.monitors.clear();
        self.notifiers.clear();
        tracing::info!("Provider registry shut down");
    }
}

fn describe(key: &ProviderKey, registered_at: DateTime<Utc>) -> ProviderDescriptor {
    ProviderDescriptor {
        kind: key.kind,
        type_name: key.type_name.clone(),
        scope: key.scope.clone(),
        registered_at,
    }
}

fn not_found(key: ProviderKey) -> ProviderError {
    ProviderError::ProviderNotFound {
        kind: key.kind,
        type_name: key.type_name,
        scope: key.scope,
    }
}
