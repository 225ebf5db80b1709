use std::sync::Arc;

use crate::application::ports::{
    MonitorProvider, NotificationError, NotificationProvider, ProviderError, ProviderFactory,
    StorageError, StorageProvider,
};
use crate::application::services::ProviderRegistry;
use crate::application::validation::{
    validate_channel_config, validate_monitor_config, validate_storage_config,
};
use crate::domain::{MonitorConfig, MonitorKind, NotificationChannelConfig, StorageConfig};
use crate::infrastructure::monitoring::{CloudEventMonitor, EventMonitor, PollingMonitor};
use crate::infrastructure::notification::{
    ChatNotifier, EmailNotifier, SmsNotifier, WebhookNotifier,
};
use crate::infrastructure::storage::{ObjectStorageProvider, S3Settings};

/// Builds providers from tagged configuration and registers every instance
/// it creates in the shared registry.
pub struct DefaultProviderFactory {
    registry: Arc<ProviderRegistry>,
}

impl DefaultProviderFactory {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn create_storage(
        &self,
        scope: &str,
        config: &StorageConfig,
    ) -> Result<Arc<dyn StorageProvider>, ProviderError> {
        validate_storage_config(config)
            .into_result()
            .map_err(ProviderError::ConfigurationInvalid)?;

        let provider = match config {
            StorageConfig::Local { path } => ObjectStorageProvider::local(path),
            StorageConfig::Azure {
                account,
                access_key,
                container,
                prefix,
            } => ObjectStorageProvider::azure(
                required(account),
                required(access_key),
                required(container),
                prefix.as_deref(),
            ),
            StorageConfig::S3 {
                bucket,
                region,
                access_key_id,
                secret_access_key,
                endpoint,
                prefix,
            } => ObjectStorageProvider::s3(S3Settings {
                bucket: required(bucket),
                region: required(region),
                access_key_id: required(access_key_id),
                secret_access_key: required(secret_access_key),
                endpoint: endpoint.as_deref(),
                prefix: prefix.as_deref(),
            }),
        }
        .map_err(storage_init_error)?;

        tracing::info!(scope, kind = %config.kind(), "Storage provider created");
        let provider: Arc<dyn StorageProvider> = Arc::new(provider);
        self.registry.register_storage(scope, Arc::clone(&provider));
        Ok(provider)
    }

    fn create_monitor(
        &self,
        scope: &str,
        config: &MonitorConfig,
    ) -> Result<Arc<dyn MonitorProvider>, ProviderError> {
        validate_monitor_config(config)
            .into_result()
            .map_err(ProviderError::ConfigurationInvalid)?;

        let provider: Arc<dyn MonitorProvider> = match config.kind {
            MonitorKind::Polling => Arc::new(PollingMonitor::new(config.clone())),
            MonitorKind::Events => Arc::new(EventMonitor::new(config.clone())),
            MonitorKind::CloudEvents => Arc::new(CloudEventMonitor::new(config.clone())),
        };
        tracing::info!(scope, kind = %config.kind, "Monitor provider created");
        self.registry.register_monitor(scope, Arc::clone(&provider));
        Ok(provider)
    }

    fn create_notifier(
        &self,
        scope: &str,
        config: &NotificationChannelConfig,
    ) -> Result<Arc<dyn NotificationProvider>, ProviderError> {
        validate_channel_config(config)
            .into_result()
            .map_err(ProviderError::ConfigurationInvalid)?;

        let provider: Arc<dyn NotificationProvider> = match config {
            NotificationChannelConfig::Email { .. } => {
                Arc::new(EmailNotifier::new(config).map_err(notifier_init_error)?)
            }
            NotificationChannelConfig::Webhook { .. } => {
                Arc::new(WebhookNotifier::new(config).map_err(notifier_init_error)?)
            }
            NotificationChannelConfig::Chat { .. } => {
                Arc::new(ChatNotifier::new(config).map_err(notifier_init_error)?)
            }
            NotificationChannelConfig::Sms { .. } => {
                Arc::new(SmsNotifier::new(config).map_err(notifier_init_error)?)
            }
        };
        tracing::info!(scope, channel = %config.channel(), "Notification provider created");
        self.registry.register_notifier(scope, Arc::clone(&provider));
        Ok(provider)
    }
}

// Presence is enforced by validation above.
fn required(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn storage_init_error(e: StorageError) -> ProviderError {
    match e {
        StorageError::InvalidConfig(message) => ProviderError::ConfigurationInvalid(vec![message]),
        other => ProviderError::InitializationFailed(other.to_string()),
    }
}

fn notifier_init_error(e: NotificationError) -> ProviderError {
    match e {
        NotificationError::InvalidConfig(errors) => ProviderError::ConfigurationInvalid(errors),
        other => ProviderError::InitializationFailed(other.to_string()),
    }
}
