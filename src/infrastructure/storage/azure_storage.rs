use std::sync::Arc;

use object_store::azure::MicrosoftAzureBuilder;

use crate::application::ports::StorageError;
use crate::domain::StorageProviderKind;

use super::object_storage::ObjectStorageProvider;

impl ObjectStorageProvider {
    pub fn azure(
        account: &str,
        access_key: &str,
        container: &str,
        prefix: Option<&str>,
    ) -> Result<Self, StorageError> {
        let store = MicrosoftAzureBuilder::new()
            .with_account(account)
            .with_access_key(access_key)
            .with_container_name(container)
            .build()
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;

        Ok(Self::from_store(
            StorageProviderKind::Azure,
            Arc::new(store),
            None,
            prefix.map(str::to_string),
        ))
    }
}
