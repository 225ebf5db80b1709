use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorKind {
    #[serde(rename = "polling")]
    Polling,
    #[serde(rename = "events")]
    Events,
    #[serde(rename = "cloud-events")]
    CloudEvents,
}

impl MonitorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorKind::Polling => "polling",
            MonitorKind::Events => "events",
            MonitorKind::CloudEvents => "cloud-events",
        }
    }
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(rename = "type")]
    pub kind: MonitorKind,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub recursive: bool,
}

fn default_scan_interval_secs() -> u64 {
    300
}

fn default_debounce_ms() -> u64 {
    2_000
}

impl MonitorConfig {
    pub fn new(kind: MonitorKind) -> Self {
        Self {
            kind,
            scan_interval_secs: default_scan_interval_secs(),
            debounce_ms: default_debounce_ms(),
            recursive: false,
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
