mod api_error;
mod api_response;
mod batch_jobs;
mod events;
mod files;
mod folders;
mod health;
mod notifications;
mod providers;

pub use api_error::ApiError;
pub use api_response::{ApiResponse, ErrorDetail};
pub use batch_jobs::{
    cancel_batch_job_handler, get_batch_job_handler, list_batch_jobs_handler,
    retry_batch_job_handler,
};
pub use events::events_handler;
pub use files::{get_file_handler, list_files_handler, retry_file_handler};
pub use folders::{
    create_folder_handler, delete_folder_handler, get_folder_handler, list_folders_handler,
    push_events_handler, scan_folder_handler, start_folder_handler, stop_folder_handler,
    update_folder_handler, validate_folder_handler,
};
pub use health::health_handler;
pub use notifications::{
    create_notification_handler, delete_notification_handler, get_notification_handler,
    list_notifications_handler, test_notification_handler, update_notification_handler,
};
pub use providers::list_providers_handler;
