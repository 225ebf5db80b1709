use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const REDACTED: &str = "********";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderKind {
    Local,
    Azure,
    S3,
}

impl StorageProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProviderKind::Local => "local",
            StorageProviderKind::Azure => "azure",
            StorageProviderKind::S3 => "s3",
        }
    }
}

impl fmt::Display for StorageProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage back-end selection, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        path: String,
    },
    Azure {
        account: Option<String>,
        access_key: Option<String>,
        container: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
    },
    S3 {
        bucket: Option<String>,
        region: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
    },
}

impl StorageConfig {
    pub fn kind(&self) -> StorageProviderKind {
        match self {
            StorageConfig::Local { .. } => StorageProviderKind::Local,
            StorageConfig::Azure { .. } => StorageProviderKind::Azure,
            StorageConfig::S3 { .. } => StorageProviderKind::S3,
        }
    }

    /// Root path handed to `list_files`: the local directory root or the
    /// object prefix inside a bucket/container.
    pub fn root(&self) -> String {
        match self {
            StorageConfig::Local { .. } => String::new(),
            StorageConfig::Azure { prefix, .. } | StorageConfig::S3 { prefix, .. } => {
                normalize(prefix.as_deref().unwrap_or_default())
            }
        }
    }

    /// Identifies the physical location behind this config. Two monitors
    /// over the same key would discover the same files twice.
    pub fn location_key(&self) -> String {
        match self {
            StorageConfig::Local { path } => {
                format!("local:{}", normalize_local(Path::new(path.trim())).display())
            }
            StorageConfig::Azure {
                account,
                container,
                prefix,
                ..
            } => format!(
                "azure:{}/{}/{}",
                account.as_deref().unwrap_or_default(),
                container.as_deref().unwrap_or_default(),
                normalize(prefix.as_deref().unwrap_or_default())
            ),
            StorageConfig::S3 {
                bucket,
                endpoint,
                prefix,
                ..
            } => format!(
                "s3:{}/{}/{}",
                endpoint.as_deref().unwrap_or("aws"),
                bucket.as_deref().unwrap_or_default(),
                normalize(prefix.as_deref().unwrap_or_default())
            ),
        }
    }

    pub fn redacted(&self) -> Self {
        match self.clone() {
            StorageConfig::Azure {
                account,
                access_key,
                container,
                prefix,
            } => StorageConfig::Azure {
                account,
                access_key: access_key.map(|_| REDACTED.to_string()),
                container,
                prefix,
            },
            StorageConfig::S3 {
                bucket,
                region,
                access_key_id,
                secret_access_key,
                endpoint,
                prefix,
            } => StorageConfig::S3 {
                bucket,
                region,
                access_key_id,
                secret_access_key: secret_access_key.map(|_| REDACTED.to_string()),
                endpoint,
                prefix,
            },
            local => local,
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim().trim_end_matches('/').to_string()
}

/// Lexical cleanup: repeated separators, `.` and `..` components. Symlinks
/// are resolved by callers that can touch the filesystem.
fn normalize_local(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
