use regex::Regex;
use serde_json::json;

use crate::domain::{ErrorCode, FileError, ProcessingConfig, RemoteFile};

/// Pre-flight checks run before a file is queued. A failure here skips the
/// file permanently.
pub struct FileValidator {
    config: ProcessingConfig,
    pattern: Option<Regex>,
}

impl FileValidator {
    pub fn new(config: &ProcessingConfig) -> Result<Self, regex::Error> {
        let pattern = config
            .filename_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        Ok(Self {
            config: config.clone(),
            pattern,
        })
    }

    pub fn check(&self, file: &RemoteFile) -> Result<(), FileError> {
        if file.size > self.config.max_file_size_bytes {
            return Err(FileError::new(
                ErrorCode::FileTooLarge,
                format!(
                    "{} is {} bytes, limit is {} bytes",
                    file.name, file.size, self.config.max_file_size_bytes
                ),
            )
            .with_details(json!({
                "file_size": file.size,
                "max_file_size": self.config.max_file_size_bytes,
            })));
        }

        if file.size == 0 {
            return Err(FileError::new(
                ErrorCode::CorruptedFile,
                format!("{} is empty", file.name),
            ));
        }

        if !is_safe_name(&file.name) {
            return Err(FileError::new(
                ErrorCode::InvalidFilename,
                format!("'{}' is not an acceptable file name", file.name),
            ));
        }

        match file.extension() {
            Some(ext) if self.config.is_extension_allowed(ext) => {}
            ext => {
                return Err(FileError::new(
                    ErrorCode::InvalidFormat,
                    format!("{} has an unsupported format", file.name),
                )
                .with_details(json!({
                    "extension": ext,
                    "allowed_extensions": self.config.allowed_extensions,
                })));
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&file.name) {
                return Err(FileError::new(
                    ErrorCode::InvalidFilename,
                    format!("{} does not match the required naming pattern", file.name),
                )
                .with_details(json!({ "pattern": pattern.as_str() })));
            }
        }

        Ok(())
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name.chars().any(|c| c.is_control() || matches!(c, '/' | '\\'))
}
