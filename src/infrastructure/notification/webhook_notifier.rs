use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::application::ports::{NotificationError, NotificationProvider};
use crate::domain::{
    Notification, NotificationChannel, NotificationChannelConfig, NotificationReceipt,
};

use super::http_delivery::{ChannelSettings, accept, default_client, message_id, transport_error};

pub const SIGNATURE_HEADER: &str = "X-Signature-256";

type HmacSha256 = Hmac<Sha256>;

/// POSTs the notification as JSON. With a secret configured the body is
/// signed with HMAC-SHA256 in [`SIGNATURE_HEADER`] as `sha256=<hex>`.
pub struct WebhookNotifier {
    settings: ChannelSettings,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: &NotificationChannelConfig) -> Result<Self, NotificationError> {
        Ok(Self {
            settings: ChannelSettings::new(NotificationChannel::Webhook, config)?,
            client: default_client(),
        })
    }
}

pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[async_trait::async_trait]
impl NotificationProvider for WebhookNotifier {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Webhook
    }

    fn configure(&self, config: &NotificationChannelConfig) -> Result<(), NotificationError> {
        self.settings.replace(config)
    }

    async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationReceipt, NotificationError> {
        let config = self.settings.load();
        let NotificationChannelConfig::Webhook {
            url,
            secret,
            headers,
            timeout_secs,
        } = config.as_ref()
        else {
            return Err(self.settings.mismatch(&config));
        };

        let body = serde_json::to_vec(notification)
            .map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?;

        let mut request = self
            .client
            .post(url)
            .timeout(Duration::from_secs(*timeout_secs))
            .header("Content-Type", "application/json")
            .header("X-Notification-Id", notification.id.to_string());
        for (key, value) in headers {
            request = request.header(key, value);
        }
        if let Some(secret) = secret {
            request = request.header(SIGNATURE_HEADER, sign(secret, &body));
        }

        tracing::debug!(url = %url, condition = %notification.condition, "Webhook send");
        let response = request.body(body).send().await.map_err(transport_error)?;
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let reply = accept(response).await?;

        Ok(NotificationReceipt::new(
            NotificationChannel::Webhook,
            request_id.or_else(|| message_id(reply.as_ref(), "id")),
        ))
    }
}
