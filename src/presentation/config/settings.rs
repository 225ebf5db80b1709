use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::services::{ProcessorSettings, RetryPolicy};
use crate::domain::ProcessingConfig;
use crate::infrastructure::observability::TracingConfig;

use super::Environment;

/// Application settings. Every section has defaults, so an empty
/// environment yields a runnable in-memory configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: Option<DatabaseSettings>,
    pub logging: LoggingSettings,
    pub processing: ProcessingConfig,
    pub analysis: AnalysisSettings,
    pub notifications: NotificationSettings,
    pub worker: WorkerSettings,
}

impl Settings {
    /// Layers `appsettings.{env}.toml` (optional) under `APP__*` variables,
    /// e.g. `APP__SERVER__PORT=8080`.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("processing.allowed_extensions")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn tracing_config(&self, environment: Environment) -> TracingConfig {
        TracingConfig {
            environment: environment.to_string(),
            json_format: self.logging.json_format,
            default_filter: self.logging.level.clone(),
        }
    }

    pub fn processor_settings(&self) -> ProcessorSettings {
        let defaults = ProcessorSettings::default();
        ProcessorSettings {
            defaults: self.processing.clone(),
            work_dir: self.worker.work_dir.clone().unwrap_or(defaults.work_dir),
            queue_capacity: self.worker.queue_capacity,
            discovery_capacity: self.worker.discovery_capacity,
            shutdown_grace: Duration::from_secs(self.worker.shutdown_grace_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: TracingConfig::default().default_filter,
            json_format: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Base URL of the analysis service. Unset runs the built-in mock.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: 300,
        }
    }
}

impl AnalysisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Delivery retry policy, independent of file retries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_secs: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_secs: 30,
        }
    }
}

impl NotificationSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_attempts.max(1),
            Duration::from_millis(self.base_delay_ms),
            Duration::from_secs(self.max_delay_secs),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub work_dir: Option<PathBuf>,
    pub queue_capacity: usize,
    pub discovery_capacity: usize,
    pub shutdown_grace_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        let defaults = ProcessorSettings::default();
        Self {
            work_dir: None,
            queue_capacity: defaults.queue_capacity,
            discovery_capacity: defaults.discovery_capacity,
            shutdown_grace_secs: defaults.shutdown_grace.as_secs(),
        }
    }
}
