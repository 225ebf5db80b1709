use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a discovered file.
///
/// ```text
/// discovered -> queued -> processing -> completed
///     |           |           |
///     +-----------+-> skipped +-> failed -> retrying -> processing
///                                   ^           |
///                                   +-----------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Discovered,
    Queued,
    Processing,
    Completed,
    Failed,
    Skipped,
    Retrying,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Discovered => "discovered",
            FileStatus::Queued => "queued",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
            FileStatus::Skipped => "skipped",
            FileStatus::Retrying => "retrying",
        }
    }

    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        use FileStatus::*;
        matches!(
            (self, next),
            (Discovered, Queued)
                | (Discovered, Skipped)
                | (Queued, Processing)
                | (Queued, Skipped)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Failed, Retrying)
                | (Retrying, Processing)
                | (Retrying, Failed)
        )
    }

    /// States in which no further automatic progress happens.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FileStatus::Completed | FileStatus::Failed | FileStatus::Skipped
        )
    }

    pub fn all() -> [FileStatus; 7] {
        [
            FileStatus::Discovered,
            FileStatus::Queued,
            FileStatus::Processing,
            FileStatus::Completed,
            FileStatus::Failed,
            FileStatus::Skipped,
            FileStatus::Retrying,
        ]
    }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileStatus::all()
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid file status: {}", s))
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
