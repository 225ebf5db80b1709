use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::application::ports::NotificationError;
use crate::application::validation::validate_channel_config;
use crate::domain::{NotificationChannel, NotificationChannelConfig};

const MAX_ERROR_BODY: usize = 512;

/// Validated, hot-swappable channel configuration shared by the HTTP
/// notifiers.
pub(super) struct ChannelSettings {
    channel: NotificationChannel,
    current: ArcSwap<NotificationChannelConfig>,
}

impl ChannelSettings {
    pub fn new(
        channel: NotificationChannel,
        config: &NotificationChannelConfig,
    ) -> Result<Self, NotificationError> {
        check(channel, config)?;
        Ok(Self {
            channel,
            current: ArcSwap::from_pointee(config.clone()),
        })
    }

    pub fn replace(&self, config: &NotificationChannelConfig) -> Result<(), NotificationError> {
        check(self.channel, config)?;
        self.current.store(Arc::new(config.clone()));
        tracing::info!(channel = %self.channel, "Notification channel reconfigured");
        Ok(())
    }

    pub fn load(&self) -> Arc<NotificationChannelConfig> {
        self.current.load_full()
    }

    pub fn mismatch(&self, config: &NotificationChannelConfig) -> NotificationError {
        NotificationError::ChannelMismatch {
            expected: self.channel,
            actual: config.channel(),
        }
    }
}

fn check(
    expected: NotificationChannel,
    config: &NotificationChannelConfig,
) -> Result<(), NotificationError> {
    if config.channel() != expected {
        return Err(NotificationError::ChannelMismatch {
            expected,
            actual: config.channel(),
        });
    }
    validate_channel_config(config)
        .into_result()
        .map_err(NotificationError::InvalidConfig)
}

pub(super) fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("callbatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub(super) fn transport_error(e: reqwest::Error) -> NotificationError {
    NotificationError::DeliveryFailed(e.to_string())
}

/// Accepts any 2xx response and returns its JSON body if it has one.
pub(super) async fn accept(
    response: reqwest::Response,
) -> Result<Option<serde_json::Value>, NotificationError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        let mut body = body;
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(NotificationError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body).ok())
}

/// Pulls a provider message id out of a JSON response body.
pub(super) fn message_id(body: Option<&serde_json::Value>, field: &str) -> Option<String> {
    body?.get(field).and_then(|v| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
