use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Machine-readable reason attached to `failed` and `skipped` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    FileTooLarge,
    InvalidFormat,
    InvalidFilename,
    AccessDenied,
    FileNotFound,
    CorruptedFile,
    DuplicateFile,
    NetworkError,
    ProcessingError,
    SystemError,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::InvalidFilename => "INVALID_FILENAME",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::CorruptedFile => "CORRUPTED_FILE",
            ErrorCode::DuplicateFile => "DUPLICATE_FILE",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ProcessingError => "PROCESSING_ERROR",
            ErrorCode::SystemError => "SYSTEM_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError | ErrorCode::ProcessingError | ErrorCode::SystemError
        )
    }
}

impl FromStr for ErrorCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FILE_TOO_LARGE" => Ok(ErrorCode::FileTooLarge),
            "INVALID_FORMAT" => Ok(ErrorCode::InvalidFormat),
            "INVALID_FILENAME" => Ok(ErrorCode::InvalidFilename),
            "ACCESS_DENIED" => Ok(ErrorCode::AccessDenied),
            "FILE_NOT_FOUND" => Ok(ErrorCode::FileNotFound),
            "CORRUPTED_FILE" => Ok(ErrorCode::CorruptedFile),
            "DUPLICATE_FILE" => Ok(ErrorCode::DuplicateFile),
            "NETWORK_ERROR" => Ok(ErrorCode::NetworkError),
            "PROCESSING_ERROR" => Ok(ErrorCode::ProcessingError),
            "SYSTEM_ERROR" => Ok(ErrorCode::SystemError),
            "CANCELLED" => Ok(ErrorCode::Cancelled),
            _ => Err(format!("Invalid error code: {}", s)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
