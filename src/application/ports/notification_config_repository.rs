use async_trait::async_trait;

use crate::domain::{NotificationConfig, NotificationConfigId};

use super::RepositoryError;

#[async_trait]
pub trait NotificationConfigRepository: Send + Sync {
    async fn create(&self, config: &NotificationConfig) -> Result<(), RepositoryError>;

    async fn get_by_id(
        &self,
        id: NotificationConfigId,
    ) -> Result<Option<NotificationConfig>, RepositoryError>;

    async fn list(&self) -> Result<Vec<NotificationConfig>, RepositoryError>;

    async fn update(&self, config: &NotificationConfig) -> Result<(), RepositoryError>;

    async fn delete(&self, id: NotificationConfigId) -> Result<bool, RepositoryError>;
}
