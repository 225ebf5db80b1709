use std::fmt::Display;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::domain::{
    FolderConfig, MIB, MonitorConfig, MonitorKind, NotificationChannelConfig, NotificationConfig,
    ProcessingConfig, StorageConfig,
};

use super::ValidationReport;

pub const MIN_FILE_SIZE_BYTES: u64 = MIB;
pub const MAX_FILE_SIZE_BYTES: u64 = 2048 * MIB;
pub const MIN_SCAN_INTERVAL_SECS: u64 = 30;
pub const MAX_SCAN_INTERVAL_SECS: u64 = 3600;
pub const MIN_DEBOUNCE_MS: u64 = 100;
pub const MAX_DEBOUNCE_MS: u64 = 60_000;
pub const MAX_RETRIES: u32 = 10;
pub const MIN_RETRY_DELAY_SECS: u64 = 10;
pub const MAX_RETRY_DELAY_SECS: u64 = 300;
pub const MIN_CONCURRENT_FILES: usize = 1;
pub const MAX_CONCURRENT_FILES: usize = 20;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_WEBHOOK_TIMEOUT_SECS: u64 = 60;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").expect("valid phone regex"));
static BUCKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("valid bucket regex"));
static CONTAINER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]{1,61})[a-z0-9]$").expect("valid container regex"));

#[derive(Default)]
struct Checks {
    errors: Vec<String>,
}

impl Checks {
    fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v),
            None => {
                self.fail(format!("{field} is required"));
                None
            }
        }
    }

    fn range<T: PartialOrd + Display>(&mut self, field: &str, value: T, min: T, max: T) {
        if value < min || value > max {
            self.fail(format!("{field} must be between {min} and {max}, got {value}"));
        }
    }

    fn name(&mut self, field: &str, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.fail(format!("{field} is required"));
        } else if trimmed.chars().count() > MAX_NAME_LENGTH {
            self.fail(format!("{field} must be at most {MAX_NAME_LENGTH} characters"));
        }
    }

    fn http_url(&mut self, field: &str, value: &str) {
        match Url::parse(value.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {}
            Ok(url) => self.fail(format!(
                "{field} must be an http(s) URL with a host, got scheme '{}'",
                url.scheme()
            )),
            Err(e) => self.fail(format!("{field} is not a valid URL: {e}")),
        }
    }

    fn recipients(&mut self, field: &str, values: &[String], pattern: &Regex, what: &str) {
        if values.is_empty() {
            self.fail(format!("{field} must contain at least one recipient"));
        }
        for value in values {
            if !pattern.is_match(value.trim()) {
                self.fail(format!("{field} contains an invalid {what}: '{value}'"));
            }
        }
    }

    fn into_report(self) -> ValidationReport {
        ValidationReport::from_errors(self.errors)
    }
}

pub fn validate_storage_config(config: &StorageConfig) -> ValidationReport {
    let mut checks = Checks::default();
    match config {
        StorageConfig::Local { path } => {
            if let Some(path) = checks.required("storage.path", Some(path.as_str())) {
                if !Path::new(path).is_absolute() {
                    checks.fail(format!("storage.path must be absolute, got '{path}'"));
                }
            }
        }
        StorageConfig::Azure {
            account,
            access_key,
            container,
            ..
        } => {
            checks.required("storage.account", account.as_deref());
            checks.required("storage.access_key", access_key.as_deref());
            if let Some(container) = checks.required("storage.container", container.as_deref()) {
                if !CONTAINER.is_match(container) {
                    checks.fail(format!("storage.container '{container}' is not a valid container name"));
                }
            }
        }
        StorageConfig::S3 {
            bucket,
            region,
            access_key_id,
            secret_access_key,
            endpoint,
            ..
        } => {
            if let Some(bucket) = checks.required("storage.bucket", bucket.as_deref()) {
                if !BUCKET.is_match(bucket) {
                    checks.fail(format!("storage.bucket '{bucket}' is not a valid bucket name"));
                }
            }
            checks.required("storage.region", region.as_deref());
            checks.required("storage.access_key_id", access_key_id.as_deref());
            checks.required("storage.secret_access_key", secret_access_key.as_deref());
            if let Some(endpoint) = endpoint {
                checks.http_url("storage.endpoint", endpoint);
            }
        }
    }
    checks.into_report()
}

pub fn validate_monitor_config(config: &MonitorConfig) -> ValidationReport {
    let mut checks = Checks::default();
    checks.range(
        "monitor.scan_interval_secs",
        config.scan_interval_secs,
        MIN_SCAN_INTERVAL_SECS,
        MAX_SCAN_INTERVAL_SECS,
    );
    checks.range(
        "monitor.debounce_ms",
        config.debounce_ms,
        MIN_DEBOUNCE_MS,
        MAX_DEBOUNCE_MS,
    );
    checks.into_report()
}

pub fn validate_processing_config(config: &ProcessingConfig) -> ValidationReport {
    let mut checks = Checks::default();
    checks.range(
        "processing.max_file_size_bytes",
        config.max_file_size_bytes,
        MIN_FILE_SIZE_BYTES,
        MAX_FILE_SIZE_BYTES,
    );
    if config.allowed_extensions.is_empty() {
        checks.fail("processing.allowed_extensions must not be empty");
    }
    for extension in &config.allowed_extensions {
        let bare = extension.trim_start_matches('.');
        if bare.is_empty() || bare.len() > 10 || !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
            checks.fail(format!(
                "processing.allowed_extensions contains an invalid extension: '{extension}'"
            ));
        }
    }
    if let Some(pattern) = &config.filename_pattern {
        if let Err(e) = Regex::new(pattern) {
            checks.fail(format!("processing.filename_pattern does not compile: {e}"));
        }
    }
    checks.range(
        "processing.max_concurrent_files",
        config.max_concurrent_files,
        MIN_CONCURRENT_FILES,
        MAX_CONCURRENT_FILES,
    );
    checks.range("processing.max_retries", config.max_retries, 0, MAX_RETRIES);
    checks.range(
        "processing.retry_delay_secs",
        config.retry_delay_secs,
        MIN_RETRY_DELAY_SECS,
        MAX_RETRY_DELAY_SECS,
    );
    checks.into_report()
}

/// Validates a folder with its processing overrides applied over `defaults`.
pub fn validate_folder_config(
    folder: &FolderConfig,
    defaults: &ProcessingConfig,
) -> ValidationReport {
    let mut checks = Checks::default();
    checks.name("name", &folder.name);
    if folder.monitor.kind == MonitorKind::Events
        && !matches!(folder.storage, StorageConfig::Local { .. })
    {
        checks.fail(format!(
            "monitor type 'events' requires local storage, got '{}'",
            folder.storage.kind()
        ));
    }

    checks
        .into_report()
        .merge(validate_storage_config(&folder.storage))
        .merge(validate_monitor_config(&folder.monitor))
        .merge(validate_processing_config(
            &folder.processing.resolve(defaults),
        ))
}

pub fn validate_channel_config(config: &NotificationChannelConfig) -> ValidationReport {
    let mut checks = Checks::default();
    match config {
        NotificationChannelConfig::Email {
            api_url, from, to, ..
        } => {
            checks.http_url("channel.api_url", api_url);
            if !EMAIL.is_match(from.trim()) {
                checks.fail(format!("channel.from is not a valid email address: '{from}'"));
            }
            checks.recipients("channel.to", to, &EMAIL, "email address");
        }
        NotificationChannelConfig::Webhook {
            url, timeout_secs, ..
        } => {
            checks.http_url("channel.url", url);
            checks.range(
                "channel.timeout_secs",
                *timeout_secs,
                1,
                MAX_WEBHOOK_TIMEOUT_SECS,
            );
        }
        NotificationChannelConfig::Chat { webhook_url, .. } => {
            checks.http_url("channel.webhook_url", webhook_url);
        }
        NotificationChannelConfig::Sms {
            api_url,
            account_sid,
            auth_token,
            from,
            to,
        } => {
            checks.http_url("channel.api_url", api_url);
            checks.required("channel.account_sid", Some(account_sid.as_str()));
            checks.required("channel.auth_token", auth_token.as_deref());
            if !PHONE.is_match(from.trim()) {
                checks.fail(format!("channel.from is not an E.164 phone number: '{from}'"));
            }
            checks.recipients("channel.to", to, &PHONE, "E.164 phone number");
        }
    }
    checks.into_report()
}

pub fn validate_notification_config(config: &NotificationConfig) -> ValidationReport {
    let mut checks = Checks::default();
    checks.name("name", &config.name);
    if config.conditions.is_empty() {
        checks.fail("conditions must contain at least one trigger condition");
    }
    checks
        .into_report()
        .merge(validate_channel_config(&config.channel))
}
