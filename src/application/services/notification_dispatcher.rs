use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::application::ports::{
    NotificationConfigRepository, NotificationError, NotificationProvider, ProviderError,
    ProviderFactory, RepositoryError,
};
use crate::domain::{
    Notification, NotificationCondition, NotificationConfig, NotificationConfigId,
    NotificationReceipt, Severity,
};

use super::provider_registry::{ProviderRegistry, notification_scope};
use super::retry_policy::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),
    #[error("notification: {0}")]
    Notification(#[from] NotificationError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fans notifications out to every enabled config whose conditions and
/// folder scope match. Delivery runs in the background and never blocks
/// the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    configs: Arc<dyn NotificationConfigRepository>,
    factory: Arc<dyn ProviderFactory>,
    registry: Arc<ProviderRegistry>,
    policy: RetryPolicy,
    serial: Arc<DashMap<NotificationConfigId, Arc<Mutex<()>>>>,
    tasks: TaskTracker,
}

impl NotificationDispatcher {
    pub fn new(
        configs: Arc<dyn NotificationConfigRepository>,
        factory: Arc<dyn ProviderFactory>,
        registry: Arc<ProviderRegistry>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            configs,
            factory,
            registry,
            policy,
            serial: Arc::new(DashMap::new()),
            tasks: TaskTracker::new(),
        }
    }

    /// Queues `notification` for delivery and returns immediately.
    pub fn dispatch(&self, notification: Notification) {
        let this = self.clone();
        self.tasks.spawn(async move {
            let configs = match this.configs.list().await {
                Ok(configs) => configs,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load notification configs");
                    return;
                }
            };

            for config in configs.into_iter().filter(|c| c.matches(&notification)) {
                let this = this.clone();
                let notification = notification.clone();
                this.tasks.clone().spawn(async move {
                    match this.deliver(&config, &notification).await {
                        Ok(receipt) => tracing::info!(
                            config_id = %config.id.as_uuid(),
                            channel = %receipt.channel,
                            condition = %notification.condition,
                            attempts = receipt.attempts,
                            "Notification delivered"
                        ),
                        Err(e) => tracing::error!(
                            config_id = %config.id.as_uuid(),
                            condition = %notification.condition,
                            error = %e,
                            "Notification delivery failed"
                        ),
                    }
                });
            }
        });
    }

    /// Sends one synthetic notification through `config` and reports the
    /// outcome to the caller.
    pub async fn test_send(
        &self,
        config: &NotificationConfig,
    ) -> Result<NotificationReceipt, DispatchError> {
        let condition = config
            .conditions
            .first()
            .copied()
            .unwrap_or(NotificationCondition::SystemError);
        let mut notification = Notification::new(
            condition,
            Severity::Info,
            format!("Test notification from {}", config.name),
            "This is a test message. No action is required.",
        );
        notification.folder_id = config.folder_id;
        self.deliver(config, &notification).await
    }

    /// Pushes an updated configuration into a live provider instance, or
    /// drops the instance when the channel changed.
    pub fn refresh(&self, config: &NotificationConfig) -> Result<(), DispatchError> {
        let scope = notification_scope(config.id);
        let channel = config.channel.channel();
        match self.registry.notifier(channel.as_str(), &scope) {
            Ok(provider) => provider.configure(&config.channel)?,
            Err(_) => {
                // Channel type changed; drop whatever was there.
                for descriptor in self.registry.list() {
                    if descriptor.scope == scope {
                        self.registry
                            .unregister(descriptor.kind, &descriptor.type_name, &scope);
                    }
                }
            }
        }
        Ok(())
    }

    pub async fn forget(&self, config_id: NotificationConfigId) {
        self.serial.remove(&config_id);
        self.registry
            .teardown_scope(&notification_scope(config_id))
            .await;
    }

    /// Waits until every delivery queued so far has finished or `timeout`
    /// elapses. Returns `false` on timeout.
    pub async fn flush(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let finished = tokio::time::timeout(timeout, self.tasks.wait())
            .await
            .is_ok();
        self.tasks.reopen();
        finished
    }

    async fn deliver(
        &self,
        config: &NotificationConfig,
        notification: &Notification,
    ) -> Result<NotificationReceipt, DispatchError> {
        let provider = self.provider_for(config)?;
        let guard = if provider.supports_concurrent_calls() {
            None
        } else {
            Some(Arc::clone(
                self.serial
                    .entry(config.id)
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .value(),
            ))
        };

        let (mut receipt, attempts) = self
            .policy
            .run(
                |_| {
                    let provider = Arc::clone(&provider);
                    let guard = guard.clone();
                    async move {
                        let _lock = match &guard {
                            Some(mutex) => Some(mutex.lock().await),
                            None => None,
                        };
                        provider.send_notification(notification).await
                    }
                },
                NotificationError::is_retryable,
            )
            .await?;
        receipt.attempts = attempts;
        Ok(receipt)
    }

    fn provider_for(
        &self,
        config: &NotificationConfig,
    ) -> Result<Arc<dyn NotificationProvider>, ProviderError> {
        let scope = notification_scope(config.id);
        self.registry
            .notifier(config.channel.channel().as_str(), &scope)
            .or_else(|_| self.factory.create_notifier(&scope, &config.channel))
    }
}
