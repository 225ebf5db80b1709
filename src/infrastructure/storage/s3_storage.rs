use std::sync::Arc;

use object_store::aws::AmazonS3Builder;

use crate::application::ports::StorageError;
use crate::domain::StorageProviderKind;

use super::object_storage::ObjectStorageProvider;

pub struct S3Settings<'a> {
    pub bucket: &'a str,
    pub region: &'a str,
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...).
    pub endpoint: Option<&'a str>,
    pub prefix: Option<&'a str>,
}

impl ObjectStorageProvider {
    pub fn s3(settings: S3Settings<'_>) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(settings.bucket)
            .with_region(settings.region)
            .with_access_key_id(settings.access_key_id)
            .with_secret_access_key(settings.secret_access_key);
        if let Some(endpoint) = settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let store = builder
            .build()
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;

        Ok(Self::from_store(
            StorageProviderKind::S3,
            Arc::new(store),
            None,
            settings.prefix.map(str::to_string),
        ))
    }
}
