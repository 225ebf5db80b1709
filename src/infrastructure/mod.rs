pub mod analysis;
pub mod monitoring;
pub mod notification;
pub mod observability;
pub mod persistence;
pub mod providers;
pub mod storage;
