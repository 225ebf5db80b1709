mod azure_storage;
mod local_storage;
mod object_storage;
mod s3_storage;

pub use object_storage::ObjectStorageProvider;
pub use s3_storage::S3Settings;
