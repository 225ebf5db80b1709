mod batch_processor;
mod file_status_tracker;
mod notification_dispatcher;
mod provider_registry;
mod retry_policy;

pub use batch_processor::{
    BatchProcessor, BatchProcessorError, DiscoverySummary, FolderState, ProcessorSettings,
};
pub use file_status_tracker::{FileStatusTracker, TransitionError};
pub use notification_dispatcher::{DispatchError, NotificationDispatcher};
pub use provider_registry::{
    ProviderDescriptor, ProviderKey, ProviderRegistry, folder_scope, notification_scope,
};
pub use retry_policy::RetryPolicy;
