use async_trait::async_trait;

use crate::application::validation::{ValidationReport, validate_channel_config};
use crate::domain::{
    Notification, NotificationChannel, NotificationChannelConfig, NotificationReceipt,
};

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    fn channel(&self) -> NotificationChannel;

    /// Replaces the active configuration. Invalid configurations are
    /// rejected and the previous one stays in place.
    fn configure(&self, config: &NotificationChannelConfig) -> Result<(), NotificationError>;

    async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationReceipt, NotificationError>;

    fn validate_config(&self, config: &NotificationChannelConfig) -> ValidationReport {
        validate_channel_config(config)
    }

    fn supports_concurrent_calls(&self) -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),
    #[error("{actual} configuration given to a {expected} provider")]
    ChannelMismatch {
        expected: NotificationChannel,
        actual: NotificationChannel,
    },
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl NotificationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            NotificationError::DeliveryFailed(_) => true,
            NotificationError::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
