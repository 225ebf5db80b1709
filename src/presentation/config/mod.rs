mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    AnalysisSettings, DatabaseSettings, LoggingSettings, NotificationSettings, ServerSettings,
    Settings, WorkerSettings,
};
