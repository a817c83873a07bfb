use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Running statistics for one "METHOD path" endpoint key.
///
/// Every field is its own atomic, so concurrent `record_request` calls
/// never lose an update. Reads across fields are not taken at a single
/// instant; a reader may see `total_requests` bumped before the matching
/// success/failure counter.
#[derive(Debug)]
pub struct EndpointMetrics {
    endpoint: String,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_execution_time_ms: AtomicI64,
    /// `i64::MAX` until the first request lands.
    min_response_time_ms: AtomicI64,
    max_response_time_ms: AtomicI64,
}

impl EndpointMetrics {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            total_execution_time_ms: AtomicI64::new(0),
            min_response_time_ms: AtomicI64::new(i64::MAX),
            max_response_time_ms: AtomicI64::new(0),
        }
    }

    pub fn record_request(&self, execution_time_ms: i64, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.total_execution_time_ms, execution_time_ms);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        self.min_response_time_ms
            .fetch_min(execution_time_ms, Ordering::Relaxed);
        self.max_response_time_ms
            .fetch_max(execution_time_ms, Ordering::Relaxed);
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    /// Percentage of successful requests; 100.0 before any request.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 100.0;
        }
        self.successful_requests() as f64 * 100.0 / total as f64
    }

    /// Integer mean, matching how the overview reports its average.
    pub fn average_response_time_ms(&self) -> i64 {
        let total = self.total_requests();
        if total == 0 {
            return 0;
        }
        self.total_execution_time_ms.load(Ordering::Relaxed) / total as i64
    }

    pub fn min_response_time_ms(&self) -> i64 {
        match self.min_response_time_ms.load(Ordering::Relaxed) {
            i64::MAX => 0,
            min => min,
        }
    }

    pub fn max_response_time_ms(&self) -> i64 {
        self.max_response_time_ms.load(Ordering::Relaxed)
    }
}

/// Adds `delta`, pinning at `i64::MIN`/`i64::MAX` instead of wrapping.
pub(crate) fn saturating_add(total: &AtomicI64, delta: i64) {
    // The closure never returns None, so the update always lands
    let _ = total.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_add(delta))
    });
}
