use serde::Serialize;

// ─── Dashboard sub-views ─────────────────────────────────────────

/// Complete analytics snapshot. Each sub-view is computed from live
/// state on its own, so views may disagree slightly under load.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub system_overview: SystemOverview,
    pub performance_metrics: PerformanceMetrics,
    pub endpoint_analytics: Vec<EndpointRow>,
    pub recent_activity: Vec<ActivityRow>,
    pub performance_insights: Vec<String>,
}

/// Process-lifetime totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemOverview {
    pub total_requests: u64,
    pub total_errors: u64,
    /// e.g. `"91.67%"`
    pub success_rate: String,
    pub error_rate: String,
    /// `"<h>h <m>m"` or `"<m>m"`
    pub system_uptime: String,
    /// Integer mean with an `ms` suffix, e.g. `"272ms"`
    pub average_response_time: String,
}

/// Latency over the recent window of the request log.
///
/// With no recent traffic only `last_10_min_requests` (zero) and
/// `message` are populated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    #[serde(rename = "last10MinRequests")]
    pub last_10_min_requests: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_response_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_response_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50_response_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_response_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99_response_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One row per tracked endpoint key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRow {
    pub endpoint: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: String,
    pub average_response_time_ms: i64,
    pub min_response_time_ms: i64,
    pub max_response_time_ms: i64,
}

/// One line of the recent-activity feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRow {
    pub request_id: String,
    pub endpoint: String,
    pub method: String,
    pub execution_time_ms: i64,
    pub success: bool,
    /// `"SUCCESS"` or `"ERROR"`
    pub status: &'static str,
    /// `HH:MM:SS`, UTC
    pub timestamp: String,
}
