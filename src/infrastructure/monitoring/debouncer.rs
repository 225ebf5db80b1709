use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

struct Pending<T> {
    last_seen: Instant,
    value: T,
}

/// Coalesces bursts of activity per key. A key becomes ready once it has
/// been quiet for the whole window; every new sighting restarts its timer
/// and replaces its value.
pub struct Debouncer<T = ()> {
    window: Duration,
    pending: HashMap<String, Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn record(&mut self, key: impl Into<String>, value: T, now: Instant) {
        self.pending.insert(
            key.into(),
            Pending {
                last_seen: now,
                value,
            },
        );
    }

    /// When the earliest pending key becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|p| p.last_seen + self.window)
            .min()
    }

    /// Removes and returns every key quiet since `now - window`, sorted by key.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<(String, T)> {
        let ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| now.duration_since(p.last_seen) >= self.window)
            .map(|(key, _)| key.clone())
            .collect();

        let mut drained: Vec<(String, T)> = ready
            .into_iter()
            .filter_map(|key| self.pending.remove(&key).map(|p| (key, p.value)))
            .collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
