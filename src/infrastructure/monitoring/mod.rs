mod cloud_event_monitor;
mod debouncer;
mod event_monitor;
mod polling_monitor;
mod watch_set;

pub use cloud_event_monitor::CloudEventMonitor;
pub use debouncer::Debouncer;
pub use event_monitor::EventMonitor;
pub use polling_monitor::{ListingTracker, PollingMonitor};
