use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl BatchJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchJobStatus::Pending => "pending",
            BatchJobStatus::Running => "running",
            BatchJobStatus::Completed => "completed",
            BatchJobStatus::Failed => "failed",
            BatchJobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchJobStatus::Completed | BatchJobStatus::Failed | BatchJobStatus::Cancelled
        )
    }
}

impl FromStr for BatchJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchJobStatus::Pending),
            "running" => Ok(BatchJobStatus::Running),
            "completed" => Ok(BatchJobStatus::Completed),
            "failed" => Ok(BatchJobStatus::Failed),
            "cancelled" => Ok(BatchJobStatus::Cancelled),
            _ => Err(format!("Invalid batch job status: {}", s)),
        }
    }
}

impl fmt::Display for BatchJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
