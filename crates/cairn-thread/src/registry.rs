//! Per-thread diagnostic state, published by each worker and read by the
//! debug thread when a dump is requested.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::worker::ThreadId;

/// A snapshot of what a worker was doing at the moment it last checked in.
#[derive(Clone, Debug)]
pub struct ThreadStatus {
    pub thread_name: String,
    pub operation: String,
    pub entries_processed: u64,
}

#[derive(Default)]
pub struct Registry {
    statuses: Mutex<HashMap<ThreadId, ThreadStatus>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn publish(&self, id: ThreadId, status: ThreadStatus) {
        self.statuses.lock().insert(id, status);
    }

    pub fn remove(&self, id: ThreadId) {
        self.statuses.lock().remove(&id);
    }

    pub fn snapshot(&self) -> Vec<(ThreadId, ThreadStatus)> {
        self.statuses.lock().iter().map(|(id, s)| (*id, s.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_and_snapshot() {
        let registry = Registry::new();
        let id = ThreadId::next();
        registry.publish(
            id,
            ThreadStatus {
                thread_name: "worker-1".into(),
                operation: "compressing /var/log".into(),
                entries_processed: 5,
            },
        );
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1.entries_processed, 5);

        registry.remove(id);
        assert!(registry.snapshot().is_empty());
    }
}
