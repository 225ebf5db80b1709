mod config_validator;
mod file_validator;
mod validation_report;

pub use config_validator::{
    MAX_CONCURRENT_FILES, MAX_DEBOUNCE_MS, MAX_FILE_SIZE_BYTES, MAX_RETRIES,
    MAX_RETRY_DELAY_SECS, MAX_SCAN_INTERVAL_SECS, MIN_CONCURRENT_FILES, MIN_DEBOUNCE_MS,
    MIN_FILE_SIZE_BYTES, MIN_RETRY_DELAY_SECS, MIN_SCAN_INTERVAL_SECS, validate_channel_config,
    validate_folder_config, validate_monitor_config, validate_notification_config,
    validate_processing_config, validate_storage_config,
};
pub use file_validator::FileValidator;
pub use validation_report::ValidationReport;
