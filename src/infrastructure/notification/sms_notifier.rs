use std::collections::HashSet;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

use crate::application::ports::{NotificationError, NotificationProvider};
use crate::domain::{
    Notification, NotificationChannel, NotificationChannelConfig, NotificationReceipt,
};

use super::http_delivery::{ChannelSettings, accept, default_client, message_id, transport_error};

const MAX_SMS_CHARS: usize = 320;
const PARTIAL_DELIVERY_TTL: Duration = Duration::from_secs(3600);

/// Sends one text per recipient through a Twilio-compatible messages API
/// (form-encoded `From`, `To`, `Body` with basic auth).
///
/// A send that fails part-way remembers who already got the text, so
/// retrying the same notification only reaches the remaining recipients.
pub struct SmsNotifier {
    settings: ChannelSettings,
    client: reqwest::Client,
    partial: DashMap<Uuid, PartialDelivery>,
}

struct PartialDelivery {
    started: Instant,
    delivered: HashSet<String>,
    last_id: Option<String>,
}

impl PartialDelivery {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            delivered: HashSet::new(),
            last_id: None,
        }
    }
}

impl SmsNotifier {
    pub fn new(config: &NotificationChannelConfig) -> Result<Self, NotificationError> {
        Ok(Self {
            settings: ChannelSettings::new(NotificationChannel::Sms, config)?,
            client: default_client(),
            partial: DashMap::new(),
        })
    }
}

#[async_trait::async_trait]
impl NotificationProvider for SmsNotifier {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Sms
    }

    fn configure(&self, config: &NotificationChannelConfig) -> Result<(), NotificationError> {
        self.settings.replace(config)
    }

    /// Providers throttle per account.
    fn supports_concurrent_calls(&self) -> bool {
        false
    }

    async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationReceipt, NotificationError> {
        let config = self.settings.load();
        let NotificationChannelConfig::Sms {
            api_url,
            account_sid,
            auth_token,
            from,
            to,
        } = config.as_ref()
        else {
            return Err(self.settings.mismatch(&config));
        };

        let body: String = format!("{}: {}", notification.title, notification.message)
            .chars()
            .take(MAX_SMS_CHARS)
            .collect();

        self.partial.retain(|_, p| p.started.elapsed() < PARTIAL_DELIVERY_TTL);
        let (delivered, mut last_id) = self
            .partial
            .get(&notification.id)
            .map(|p| (p.delivered.clone(), p.last_id.clone()))
            .unwrap_or_default();

        for recipient in to.iter().filter(|r| !delivered.contains(*r)) {
            let response = self
                .client
                .post(api_url)
                .basic_auth(account_sid, auth_token.as_deref())
                .form(&[("From", from.as_str()), ("To", recipient.as_str()), ("Body", body.as_str())])
                .send()
                .await
                .map_err(transport_error)?;
            let reply = accept(response).await?;
            last_id = message_id(reply.as_ref(), "sid").or(last_id);

            let mut partial = self
                .partial
                .entry(notification.id)
                .or_insert_with(PartialDelivery::new);
            partial.delivered.insert(recipient.clone());
            partial.last_id.clone_from(&last_id);
        }
        self.partial.remove(&notification.id);
        tracing::debug!(
            recipients = to.len(),
            resumed = delivered.len(),
            "SMS accepted"
        );
        Ok(NotificationReceipt::new(NotificationChannel::Sms, last_id))
    }
}
