use std::sync::Arc;

use crate::domain::{MonitorConfig, NotificationChannelConfig, ProviderKind, StorageConfig};

use super::{MonitorProvider, NotificationProvider, StorageProvider};

/// Validates a configuration fragment, builds the matching provider and
/// registers it under `scope`. Providers come back constructed but not
/// started.
pub trait ProviderFactory: Send + Sync {
    fn create_storage(
        &self,
        scope: &str,
        config: &StorageConfig,
    ) -> Result<Arc<dyn StorageProvider>, ProviderError>;

    fn create_monitor(
        &self,
        scope: &str,
        config: &MonitorConfig,
    ) -> Result<Arc<dyn MonitorProvider>, ProviderError>;

    fn create_notifier(
        &self,
        scope: &str,
        config: &NotificationChannelConfig,
    ) -> Result<Arc<dyn NotificationProvider>, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no {kind} provider registered for {type_name} in scope {scope}")]
    ProviderNotFound {
        kind: ProviderKind,
        type_name: String,
        scope: String,
    },
    #[error("configuration invalid: {}", .0.join("; "))]
    ConfigurationInvalid(Vec<String>),
    #[error("provider initialization failed: {0}")]
    InitializationFailed(String),
}
