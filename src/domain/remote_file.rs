use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FolderId;

/// A file as reported by a storage provider listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub path: String,
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl RemoteFile {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            path,
            name,
            size,
            last_modified: None,
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// True when the file sits in a sub-directory of `root` rather than
    /// directly inside it.
    pub fn is_nested_under(&self, root: &str) -> bool {
        let relative = self
            .path
            .strip_prefix(root)
            .unwrap_or(&self.path)
            .trim_start_matches('/');
        relative.contains('/')
    }

    pub fn extension(&self) -> Option<&str> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Poll,
    FileSystemEvent,
    CloudEvent,
    ManualScan,
}

/// Files surfaced by a monitor (or a manual scan) for one folder.
#[derive(Debug, Clone)]
pub struct DiscoveryEvent {
    pub folder_id: FolderId,
    pub files: Vec<RemoteFile>,
    pub source: DiscoverySource,
    pub detected_at: DateTime<Utc>,
}

impl DiscoveryEvent {
    pub fn new(folder_id: FolderId, files: Vec<RemoteFile>, source: DiscoverySource) -> Self {
        Self {
            folder_id,
            files,
            source,
            detected_at: Utc::now(),
        }
    }
}
