use serde_json::{Map, Value, json};

use crate::application::ports::{NotificationError, NotificationProvider};
use crate::domain::{
    Notification, NotificationChannel, NotificationChannelConfig, NotificationReceipt, Severity,
};

use super::http_delivery::{ChannelSettings, accept, default_client, transport_error};

/// Posts to a Slack-compatible incoming webhook.
pub struct ChatNotifier {
    settings: ChannelSettings,
    client: reqwest::Client,
}

impl ChatNotifier {
    pub fn new(config: &NotificationChannelConfig) -> Result<Self, NotificationError> {
        Ok(Self {
            settings: ChannelSettings::new(NotificationChannel::Chat, config)?,
            client: default_client(),
        })
    }
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => ":information_source:",
        Severity::Warning => ":warning:",
        Severity::Critical => ":rotating_light:",
    }
}

#[async_trait::async_trait]
impl NotificationProvider for ChatNotifier {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Chat
    }

    fn configure(&self, config: &NotificationChannelConfig) -> Result<(), NotificationError> {
        self.settings.replace(config)
    }

    async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationReceipt, NotificationError> {
        let config = self.settings.load();
        let NotificationChannelConfig::Chat {
            webhook_url,
            channel,
            username,
        } = config.as_ref()
        else {
            return Err(self.settings.mismatch(&config));
        };

        let mut text = format!(
            "{} *{}*\n{}",
            severity_marker(notification.severity),
            notification.title,
            notification.message
        );
        if let Some(code) = notification.error_code {
            text.push_str(&format!("\n`{code}`"));
        }

        let mut payload = Map::new();
        payload.insert("text".into(), json!(text));
        if let Some(channel) = channel {
            payload.insert("channel".into(), json!(channel));
        }
        if let Some(username) = username {
            payload.insert("username".into(), json!(username));
        }

        let response = self
            .client
            .post(webhook_url)
            .json(&Value::Object(payload))
            .send()
            .await
            .map_err(transport_error)?;
        accept(response).await?;
        Ok(NotificationReceipt::new(NotificationChannel::Chat, None))
    }
}
