use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MonitorConfig, ProcessingOverrides, StorageConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(Uuid);

impl FolderId {
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

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

/// One watched source: where files live, how new ones are detected and the
/// processing limits applied to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderConfig {
    pub id: FolderId,
    pub name: String,
    pub storage: StorageConfig,
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub processing: ProcessingOverrides,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FolderConfig {
    pub fn new(
        name: String,
        storage: StorageConfig,
        monitor: MonitorConfig,
        processing: ProcessingOverrides,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: FolderId::new(),
            name,
            storage,
            monitor,
            processing,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy with storage credentials masked, for responses and logs.
    pub fn redacted(&self) -> Self {
        Self {
            storage: self.storage.redacted(),
            ..self.clone()
        }
    }
}
