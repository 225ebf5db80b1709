#![allow(dead_code)]

pub mod harness;

pub use fakes::{FakeStorage, IdleMonitor, RecordingNotifier, ScriptedAnalysis, Step};
pub use harness::{Harness, audio};
pub use mock_server::MockServer;
