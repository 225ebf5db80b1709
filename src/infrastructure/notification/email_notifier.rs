use serde_json::json;

use crate::application::ports::{NotificationError, NotificationProvider};
use crate::domain::{
    Notification, NotificationChannel, NotificationChannelConfig, NotificationReceipt,
};

use super::http_delivery::{ChannelSettings, accept, default_client, message_id, transport_error};

/// Sends mail through a transactional mail HTTP API accepting
/// `{from, to, subject, text}` with bearer authentication.
pub struct EmailNotifier {
    settings: ChannelSettings,
    client: reqwest::Client,
}

impl EmailNotifier {
    pub fn new(config: &NotificationChannelConfig) -> Result<Self, NotificationError> {
        Ok(Self {
            settings: ChannelSettings::new(NotificationChannel::Email, config)?,
            client: default_client(),
        })
    }
}

#[async_trait::async_trait]
impl NotificationProvider for EmailNotifier {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Email
    }

    fn configure(&self, config: &NotificationChannelConfig) -> Result<(), NotificationError> {
        self.settings.replace(config)
    }

    async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationReceipt, NotificationError> {
        let config = self.settings.load();
        let NotificationChannelConfig::Email {
            api_url,
            api_key,
            from,
            to,
            subject_prefix,
        } = config.as_ref()
        else {
            return Err(self.settings.mismatch(&config));
        };

        let subject = match subject_prefix {
            Some(prefix) => format!("{prefix} {}", notification.title),
            None => notification.title.clone(),
        };
        let mut text = notification.message.clone();
        if let Some(file_name) = &notification.file_name {
            text.push_str(&format!("\n\nFile: {file_name}"));
        }
        if let Some(code) = notification.error_code {
            text.push_str(&format!("\nError code: {code}"));
        }
        text.push_str(&format!("\nSeverity: {}", notification.severity.as_str()));

        let mut request = self.client.post(api_url).json(&json!({
            "from": from,
            "to": to,
            "subject": subject,
            "text": text,
        }));
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(transport_error)?;
        let reply = accept(response).await?;
        tracing::debug!(recipients = to.len(), "Email accepted by mail API");
        Ok(NotificationReceipt::new(
            NotificationChannel::Email,
            message_id(reply.as_ref(), "id"),
        ))
    }
}
