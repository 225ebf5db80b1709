use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MIB: u64 = 1024 * 1024;

/// Effective processing limits for one folder: global defaults with the
/// folder's overrides applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub max_file_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub filename_pattern: Option<String>,
    pub max_concurrent_files: usize,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub exponential_backoff: bool,
    pub auto_start: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 500 * MIB,
            allowed_extensions: ["mp3", "wav", "m4a", "ogg", "flac", "webm", "aac", "mp4"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            filename_pattern: None,
            max_concurrent_files: 3,
            max_retries: 3,
            retry_delay_secs: 30,
            exponential_backoff: true,
            auto_start: true,
        }
    }
}

impl ProcessingConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

/// Per-folder overrides; `None` falls back to the global default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOverrides {
    #[serde(default)]
    pub max_file_size_bytes: Option<u64>,
    #[serde(default)]
    pub allowed_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub filename_pattern: Option<String>,
    #[serde(default)]
    pub max_concurrent_files: Option<usize>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub retry_delay_secs: Option<u64>,
    #[serde(default)]
    pub exponential_backoff: Option<bool>,
    #[serde(default)]
    pub auto_start: Option<bool>,
}

impl ProcessingOverrides {
    pub fn resolve(&self, defaults: &ProcessingConfig) -> ProcessingConfig {
        ProcessingConfig {
            max_file_size_bytes: self
                .max_file_size_bytes
                .unwrap_or(defaults.max_file_size_bytes),
            allowed_extensions: self
                .allowed_extensions
                .clone()
                .unwrap_or_else(|| defaults.allowed_extensions.clone()),
            filename_pattern: self
                .filename_pattern
                .clone()
                .or_else(|| defaults.filename_pattern.clone()),
            max_concurrent_files: self
                .max_concurrent_files
                .unwrap_or(defaults.max_concurrent_files),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_secs: self.retry_delay_secs.unwrap_or(defaults.retry_delay_secs),
            exponential_backoff: self
                .exponential_backoff
                .unwrap_or(defaults.exponential_backoff),
            auto_start: self.auto_start.unwrap_or(defaults.auto_start),
        }
    }
}
