use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage_config::REDACTED;
use super::{BatchJobId, ErrorCode, FileRecordId, FolderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationConfigId(Uuid);

impl NotificationConfigId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NotificationConfigId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Webhook,
    Chat,
    Sms,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Webhook => "webhook",
            NotificationChannel::Chat => "chat",
            NotificationChannel::Sms => "sms",
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

/// Delivery channel and its credentials, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationChannelConfig {
    /// Transactional mail over an HTTP mail API.
    Email {
        api_url: String,
        #[serde(default)]
        api_key: Option<String>,
        from: String,
        to: Vec<String>,
        #[serde(default)]
        subject_prefix: Option<String>,
    },
    Webhook {
        url: String,
        #[serde(default)]
        secret: Option<String>,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default = "default_webhook_timeout_secs")]
        timeout_secs: u64,
    },
    /// Slack-compatible incoming webhook.
    Chat {
        webhook_url: String,
        #[serde(default)]
        channel: Option<String>,
        #[serde(default)]
        username: Option<String>,
    },
    /// Twilio-compatible messages API.
    Sms {
        api_url: String,
        account_sid: String,
        #[serde(default)]
        auth_token: Option<String>,
        from: String,
        to: Vec<String>,
    },
}

impl NotificationChannelConfig {
    pub fn channel(&self) -> NotificationChannel {
        match self {
            NotificationChannelConfig::Email { .. } => NotificationChannel::Email,
            NotificationChannelConfig::Webhook { .. } => NotificationChannel::Webhook,
            NotificationChannelConfig::Chat { .. } => NotificationChannel::Chat,
            NotificationChannelConfig::Sms { .. } => NotificationChannel::Sms,
        }
    }

    pub fn redacted(&self) -> Self {
        let mask = |secret: Option<String>| secret.map(|_| REDACTED.to_string());
        match self.clone() {
            NotificationChannelConfig::Email {
                api_url,
                api_key,
                from,
                to,
                subject_prefix,
            } => NotificationChannelConfig::Email {
                api_url,
                api_key: mask(api_key),
                from,
                to,
                subject_prefix,
            },
            NotificationChannelConfig::Webhook {
                url,
                secret,
                headers,
                timeout_secs,
            } => NotificationChannelConfig::Webhook {
                url,
                secret: mask(secret),
                headers,
                timeout_secs,
            },
            NotificationChannelConfig::Sms {
                api_url,
                account_sid,
                auth_token,
                from,
                to,
            } => NotificationChannelConfig::Sms {
                api_url,
                account_sid,
                auth_token: mask(auth_token),
                from,
                to,
            },
            chat => chat,
        }
    }
}

/// Named trigger controlling when a notification configuration fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCondition {
    FileCompleted,
    FileFailed,
    FileSkipped,
    BatchStarted,
    BatchCompleted,
    BatchFailed,
    BatchCancelled,
    SystemError,
}

impl NotificationCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCondition::FileCompleted => "file_completed",
            NotificationCondition::FileFailed => "file_failed",
            NotificationCondition::FileSkipped => "file_skipped",
            NotificationCondition::BatchStarted => "batch_started",
            NotificationCondition::BatchCompleted => "batch_completed",
            NotificationCondition::BatchFailed => "batch_failed",
            NotificationCondition::BatchCancelled => "batch_cancelled",
            NotificationCondition::SystemError => "system_error",
        }
    }
}

impl FromStr for NotificationCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("Invalid notification condition: {}", s))
    }
}

impl fmt::Display for NotificationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub id: NotificationConfigId,
    pub name: String,
    pub channel: NotificationChannelConfig,
    pub conditions: Vec<NotificationCondition>,
    pub enabled: bool,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationConfig {
    pub fn new(
        name: String,
        channel: NotificationChannelConfig,
        conditions: Vec<NotificationCondition>,
        folder_id: Option<FolderId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: NotificationConfigId::new(),
            name,
            channel,
            conditions,
            enabled: true,
            folder_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn matches(&self, notification: &Notification) -> bool {
        self.enabled
            && self.conditions.contains(&notification.condition)
            && match (self.folder_id, notification.folder_id) {
                (None, _) => true,
                (Some(scope), Some(folder)) => scope == folder,
                (Some(_), None) => false,
            }
    }

    pub fn redacted(&self) -> Self {
        Self {
            channel: self.channel.redacted(),
            ..self.clone()
        }
    }
}

/// A message produced by the orchestrator for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub condition: NotificationCondition,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub folder_id: Option<FolderId>,
    pub batch_job_id: Option<BatchJobId>,
    pub file_record_id: Option<FileRecordId>,
    pub file_name: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        condition: NotificationCondition,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            condition,
            severity,
            title: title.into(),
            message: message.into(),
            folder_id: None,
            batch_job_id: None,
            file_record_id: None,
            file_name: None,
            error_code: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_folder(mut self, folder_id: FolderId) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    pub fn for_job(mut self, batch_job_id: BatchJobId) -> Self {
        self.batch_job_id = Some(batch_job_id);
        self
    }

    pub fn for_file(mut self, record_id: FileRecordId, file_name: impl Into<String>) -> Self {
        self.file_record_id = Some(record_id);
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_error_code(mut self, code: ErrorCode) -> Self {
        self.error_code = Some(code);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationReceipt {
    pub channel: NotificationChannel,
    pub delivered_at: DateTime<Utc>,
    pub provider_message_id: Option<String>,
    pub attempts: u32,
}

impl NotificationReceipt {
    pub fn new(channel: NotificationChannel, provider_message_id: Option<String>) -> Self {
        Self {
            channel,
            delivered_at: Utc::now(),
            provider_message_id,
            attempts: 1,
        }
    }
}
