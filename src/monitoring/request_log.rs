use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// One recorded request outcome. Immutable once logged.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogEntry {
    pub request_id: String,
    pub endpoint: String,
    pub method: String,
    pub execution_time_ms: i64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Fixed-capacity FIFO of the most recent request outcomes.
///
/// Append and evict happen under the same lock, so the log never holds
/// more than `capacity` entries, even for a moment.
pub struct RequestLog {
    entries: Mutex<VecDeque<RequestLogEntry>>,
    capacity: usize,
}

impl RequestLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    pub fn push(&self, entry: RequestLogEntry) {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Copy of the log, oldest first.
    pub fn snapshot(&self) -> Vec<RequestLogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
