mod file_status_test;
mod folder_config_test;
mod notification_test;
