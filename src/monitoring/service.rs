use std::cmp::Reverse;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::dashboard::{
    ActivityRow, AnalyticsSnapshot, EndpointRow, PerformanceMetrics, SystemOverview,
};
use super::endpoint::{saturating_add, EndpointMetrics};
use super::percentiles::PercentileSet;
use super::request_log::{RequestLog, RequestLogEntry};

// ─── Configuration ───────────────────────────────────────────────

/// How many individual request outcomes the rolling log keeps
pub const REQUEST_LOG_CAPACITY: usize = 1000;

/// Width of the "recent" latency window
const RECENT_WINDOW_MINUTES: i64 = 10;

/// Rows in the recent-activity feed
const RECENT_ACTIVITY_LIMIT: usize = 20;

/// Endpoints whose path contains this are counted as validation checks.
/// Coupled to the route naming in `server.rs`.
pub const VALIDATION_ROUTE_MARKER: &str = "/validate";

// Insight thresholds
const ERROR_INSIGHT_MIN_REQUESTS: u64 = 10;
const HIGH_ERROR_RATE_PCT: f64 = 5.0;
const MODERATE_ERROR_RATE_PCT: f64 = 1.0;
const SLOW_RESPONSE_MS: i64 = 1000;
const MODERATE_RESPONSE_MS: i64 = 500;
const POPULAR_ENDPOINT_MIN_REQUESTS: u64 = 5;

// ─── MonitoringService ───────────────────────────────────────────

/// In-process API monitor. One instance lives for the whole process and
/// is shared by every handler through `AppState`.
///
/// Handlers call `record_request()` on every exit path, the analytics
/// endpoints call `analytics_dashboard()`. Recording is append-only: a
/// retried request recorded twice is counted twice.
pub struct MonitoringService {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    total_execution_time_ms: AtomicI64,
    endpoints: DashMap<String, EndpointMetrics>,
    request_log: RequestLog,
    system_start_time: DateTime<Utc>,
}

impl MonitoringService {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(system_start_time: DateTime<Utc>) -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_execution_time_ms: AtomicI64::new(0),
            endpoints: DashMap::new(),
            request_log: RequestLog::with_capacity(REQUEST_LOG_CAPACITY),
            system_start_time,
        }
    }

    /// Record one finished request. Never fails; execution times are
    /// taken as given, negative values included.
    pub fn record_request(
        &self,
        endpoint: &str,
        method: &str,
        execution_time_ms: i64,
        success: bool,
        request_id: &str,
    ) {
        self.record_request_at(
            endpoint,
            method,
            execution_time_ms,
            success,
            request_id,
            Utc::now(),
        );
    }

    pub fn record_request_at(
        &self,
        endpoint: &str,
        method: &str,
        execution_time_ms: i64,
        success: bool,
        request_id: &str,
        at: DateTime<Utc>,
    ) {
        // ── Global counters ─────────────────────────────────────
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.total_execution_time_ms, execution_time_ms);
        if !success {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }

        // ── Per-endpoint metrics ────────────────────────────────
        let key = endpoint_key(method, endpoint);
        self.endpoints
            .entry(key.clone())
            .or_insert_with(|| EndpointMetrics::new(key))
            .record_request(execution_time_ms, success);

        // ── Rolling log ─────────────────────────────────────────
        self.request_log.push(RequestLogEntry {
            request_id: request_id.to_owned(),
            endpoint: endpoint.to_owned(),
            method: method.to_owned(),
            execution_time_ms,
            success,
            timestamp: at,
        });

        tracing::trace!(
            request_id,
            method,
            endpoint,
            execution_time_ms,
            success,
            "request recorded"
        );
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    /// Number of distinct endpoint keys seen so far.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Copy of the rolling log, oldest first.
    pub fn request_log(&self) -> Vec<RequestLogEntry> {
        self.request_log.snapshot()
    }

    pub fn analytics_dashboard(&self) -> AnalyticsSnapshot {
        self.analytics_dashboard_at(Utc::now())
    }

    /// Build the dashboard as seen at `now`.
    pub fn analytics_dashboard_at(&self, now: DateTime<Utc>) -> AnalyticsSnapshot {
        let log = self.request_log.snapshot();

        AnalyticsSnapshot {
            system_overview: self.system_overview(now),
            performance_metrics: performance_metrics(&log, now),
            endpoint_analytics: self.endpoint_analytics(),
            recent_activity: recent_activity(&log),
            performance_insights: self.performance_insights(&log),
        }
    }

    // ── Sub-views ───────────────────────────────────────────────

    fn system_overview(&self, now: DateTime<Utc>) -> SystemOverview {
        let total = self.total_requests();
        let errors = self.total_errors();

        let (success_rate, error_rate, average) = if total > 0 {
            let error_pct = errors as f64 * 100.0 / total as f64;
            let success_pct = total.saturating_sub(errors) as f64 * 100.0 / total as f64;
            (
                format!("{success_pct:.2}%"),
                format!("{error_pct:.2}%"),
                format!("{}ms", self.average_response_time_ms()),
            )
        } else {
            ("100.00%".into(), "0.00%".into(), "0ms".into())
        };

        SystemOverview {
            total_requests: total,
            total_errors: errors,
            success_rate,
            error_rate,
            system_uptime: format_uptime(now - self.system_start_time),
            average_response_time: average,
        }
    }

    fn endpoint_analytics(&self) -> Vec<EndpointRow> {
        let mut rows: Vec<EndpointRow> = self
            .endpoints
            .iter()
            .map(|entry| {
                let m = entry.value();
                EndpointRow {
                    endpoint: m.endpoint().to_owned(),
                    total_requests: m.total_requests(),
                    successful_requests: m.successful_requests(),
                    failed_requests: m.failed_requests(),
                    success_rate: format!("{:.2}%", m.success_rate()),
                    average_response_time_ms: m.average_response_time_ms(),
                    min_response_time_ms: m.min_response_time_ms(),
                    max_response_time_ms: m.max_response_time_ms(),
                }
            })
            .collect();

        // Busiest first; ties broken by key so the order is stable
        rows.sort_by(|a, b| {
            b.total_requests
                .cmp(&a.total_requests)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });
        rows
    }

    fn performance_insights(&self, log: &[RequestLogEntry]) -> Vec<String> {
        let mut insights = Vec::new();

        let total = self.total_requests();
        let errors = self.total_errors();

        // ── Error rate ──────────────────────────────────────────
        if total > ERROR_INSIGHT_MIN_REQUESTS && errors > 0 {
            let error_rate = errors as f64 * 100.0 / total as f64;
            if error_rate > HIGH_ERROR_RATE_PCT {
                insights.push(format!(
                    "HIGH ERROR RATE: {error_rate:.1}% - Consider investigating validation failures"
                ));
            } else if error_rate > MODERATE_ERROR_RATE_PCT {
                insights.push(format!(
                    "MODERATE ERROR RATE: {error_rate:.1}% - Monitor for patterns"
                ));
            }
        }

        // ── Response time tier ──────────────────────────────────
        if total > 0 {
            let avg = self.average_response_time_ms();
            let insight = if avg > SLOW_RESPONSE_MS {
                format!("SLOW RESPONSE TIMES: Average {avg}ms - Consider database optimization")
            } else if avg > MODERATE_RESPONSE_MS {
                format!("MODERATE RESPONSE TIMES: Average {avg}ms - Performance is acceptable")
            } else {
                format!("EXCELLENT RESPONSE TIMES: Average {avg}ms - API performing optimally")
            };
            insights.push(insight);
        }

        // ── Endpoint popularity ─────────────────────────────────
        let most_popular = self
            .endpoints
            .iter()
            .map(|entry| (entry.value().total_requests(), entry.key().clone()))
            .max_by_key(|(count, key)| (*count, Reverse(key.clone())));
        if let Some((count, key)) = most_popular {
            if count > POPULAR_ENDPOINT_MIN_REQUESTS {
                insights.push(format!("MOST POPULAR ENDPOINT: {key} ({count} requests)"));
            }
        }

        // ── Validation failures ─────────────────────────────────
        let blocked = log
            .iter()
            .filter(|e| !e.success && e.endpoint.contains(VALIDATION_ROUTE_MARKER))
            .count();
        if blocked > 0 {
            insights.push(format!(
                "VALIDATION WORKING: {blocked} validation failures blocked invalid data"
            ));
        }

        if insights.is_empty() {
            insights.push("SYSTEM HEALTHY: All metrics within normal ranges".into());
        }

        insights
    }

    fn average_response_time_ms(&self) -> i64 {
        let total = self.total_requests();
        if total == 0 {
            return 0;
        }
        self.total_execution_time_ms.load(Ordering::Relaxed) / total as i64
    }
}

impl Default for MonitoringService {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

pub fn endpoint_key(method: &str, endpoint: &str) -> String {
    format!("{method} {endpoint}")
}

/// `"<h>h <m>m"` once an hour has passed, `"<m>m"` before that.
pub fn format_uptime(uptime: Duration) -> String {
    let hours = uptime.num_hours();
    let minutes = uptime.num_minutes() % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

fn performance_metrics(log: &[RequestLogEntry], now: DateTime<Utc>) -> PerformanceMetrics {
    let cutoff = now - Duration::minutes(RECENT_WINDOW_MINUTES);
    let mut recent: Vec<i64> = log
        .iter()
        .filter(|e| e.timestamp > cutoff)
        .map(|e| e.execution_time_ms)
        .collect();

    match PercentileSet::from_samples(&mut recent) {
        Some(set) => PerformanceMetrics {
            last_10_min_requests: set.count,
            average_response_time_ms: Some(set.mean),
            min_response_time_ms: Some(set.min),
            max_response_time_ms: Some(set.max),
            p50_response_time_ms: Some(set.p50),
            p95_response_time_ms: Some(set.p95),
            p99_response_time_ms: Some(set.p99),
            message: None,
        },
        None => PerformanceMetrics {
            last_10_min_requests: 0,
            average_response_time_ms: None,
            min_response_time_ms: None,
            max_response_time_ms: None,
            p50_response_time_ms: None,
            p95_response_time_ms: None,
            p99_response_time_ms: None,
            message: Some(format!(
                "No requests in the last {RECENT_WINDOW_MINUTES} minutes"
            )),
        },
    }
}

fn recent_activity(log: &[RequestLogEntry]) -> Vec<ActivityRow> {
    // Newest first; the stable sort keeps newer entries ahead on equal timestamps
    let mut entries: Vec<&RequestLogEntry> = log.iter().rev().collect();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    entries
        .into_iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .map(|e| ActivityRow {
            request_id: e.request_id.clone(),
            endpoint: e.endpoint.clone(),
            method: e.method.clone(),
            execution_time_ms: e.execution_time_ms,
            success: e.success,
            status: if e.success { "SUCCESS" } else { "ERROR" },
            timestamp: e.timestamp.format("%H:%M:%S").to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const HEALTHY: &str = "SYSTEM HEALTHY: All metrics within normal ranges";

    fn has_insight(snapshot: &AnalyticsSnapshot, prefix: &str) -> bool {
        snapshot
            .performance_insights
            .iter()
            .any(|i| i.starts_with(prefix))
    }

    #[test]
    fn empty_service_reports_healthy_defaults() {
        let svc = MonitoringService::new();
        let dash = svc.analytics_dashboard();

        let overview = &dash.system_overview;
        assert_eq!(overview.total_requests, 0);
        assert_eq!(overview.total_errors, 0);
        assert_eq!(overview.success_rate, "100.00%");
        assert_eq!(overview.error_rate, "0.00%");
        assert_eq!(overview.average_response_time, "0ms");
        assert_eq!(overview.system_uptime, "0m");

        assert_eq!(dash.performance_metrics.last_10_min_requests, 0);
        assert!(dash.performance_metrics.message.is_some());
        assert!(dash.performance_metrics.p50_response_time_ms.is_none());
        assert!(dash.endpoint_analytics.is_empty());
        assert!(dash.recent_activity.is_empty());
        assert_eq!(dash.performance_insights, vec![HEALTHY.to_string()]);
    }

    #[test]
    fn counters_match_recorded_calls() {
        let svc = MonitoringService::new();
        let outcomes = [true, false, true, true, false, true, false];
        for (i, ok) in outcomes.iter().enumerate() {
            svc.record_request("/api/users", "GET", 10, *ok, &format!("r{i}"));
        }
        assert_eq!(svc.total_requests(), 7);
        assert_eq!(svc.total_errors(), 3);
    }

    #[test]
    fn endpoint_row_for_mixed_outcomes() {
        let svc = MonitoringService::new();
        for i in 0..10 {
            svc.record_request("/api/users", "GET", 100, true, &format!("ok{i}"));
        }
        svc.record_request("/api/users", "GET", 2000, false, "bad");

        let dash = svc.analytics_dashboard();
        assert_eq!(dash.endpoint_analytics.len(), 1);
        let row = &dash.endpoint_analytics[0];
        assert_eq!(row.endpoint, "GET /api/users");
        assert_eq!(row.total_requests, 11);
        assert_eq!(row.successful_requests, 10);
        assert_eq!(row.failed_requests, 1);
        assert_eq!(row.success_rate, "90.91%");
        assert_eq!(row.average_response_time_ms, 272);
        assert_eq!(row.min_response_time_ms, 100);
        assert_eq!(row.max_response_time_ms, 2000);
    }

    #[test]
    fn rates_add_up_to_one_hundred() {
        let svc = MonitoringService::new();
        for i in 0..12 {
            svc.record_request("/api/users", "GET", 20, i != 0, "r");
        }
        let overview = svc.analytics_dashboard().system_overview;
        assert_eq!(overview.success_rate, "91.67%");
        assert_eq!(overview.error_rate, "8.33%");

        let parse = |s: &str| s.trim_end_matches('%').parse::<f64>().unwrap();
        let sum = parse(&overview.success_rate) + parse(&overview.error_rate);
        assert!((sum - 100.0).abs() < 0.011);
    }

    #[test]
    fn twelve_requests_one_failure_is_a_high_error_rate() {
        let svc = MonitoringService::new();
        for i in 0..12 {
            svc.record_request("/api/users", "GET", 20, i != 5, "r");
        }
        let dash = svc.analytics_dashboard();
        assert!(has_insight(&dash, "HIGH ERROR RATE: 8.3%"));
        assert!(!has_insight(&dash, "MODERATE ERROR RATE"));
        assert!(!has_insight(&dash, "SYSTEM HEALTHY"));
    }

    #[test]
    fn moderate_error_rate_band() {
        let svc = MonitoringService::new();
        // 2 failures out of 50 → 4%
        for i in 0..50 {
            svc.record_request("/api/users", "GET", 20, i >= 2, "r");
        }
        let dash = svc.analytics_dashboard();
        assert!(has_insight(&dash, "MODERATE ERROR RATE: 4.0%"));
        assert!(!has_insight(&dash, "HIGH ERROR RATE"));
    }

    #[test]
    fn error_rate_insight_needs_more_than_ten_requests() {
        let svc = MonitoringService::new();
        for i in 0..10 {
            svc.record_request("/api/users", "GET", 20, i != 0, "r");
        }
        let dash = svc.analytics_dashboard();
        assert!(!has_insight(&dash, "HIGH ERROR RATE"));
        assert!(!has_insight(&dash, "MODERATE ERROR RATE"));
    }

    #[test]
    fn response_time_tiers() {
        let cases = [
            (1500, "SLOW RESPONSE TIMES: Average 1500ms"),
            (700, "MODERATE RESPONSE TIMES: Average 700ms"),
            (40, "EXCELLENT RESPONSE TIMES: Average 40ms"),
        ];
        for (ms, expected) in cases {
            let svc = MonitoringService::new();
            svc.record_request("/api/users", "GET", ms, true, "r");
            assert!(
                has_insight(&svc.analytics_dashboard(), expected),
                "missing {expected}"
            );
        }
    }

    #[test]
    fn most_popular_endpoint_needs_more_than_five_requests() {
        let svc = MonitoringService::new();
        for _ in 0..5 {
            svc.record_request("/api/users", "GET", 10, true, "r");
        }
        assert!(!has_insight(&svc.analytics_dashboard(), "MOST POPULAR"));

        svc.record_request("/api/users", "GET", 10, true, "r");
        svc.record_request("/api/users", "POST", 10, true, "r");
        assert!(svc
            .analytics_dashboard()
            .performance_insights
            .contains(&"MOST POPULAR ENDPOINT: GET /api/users (6 requests)".to_string()));
    }

    #[test]
    fn validation_failures_are_counted_from_the_log() {
        let svc = MonitoringService::new();
        svc.record_request("/api/users/validate", "POST", 5, false, "v1");
        svc.record_request("/api/users/validate", "POST", 5, false, "v2");
        svc.record_request("/api/users/validate", "POST", 5, true, "v3");
        svc.record_request("/api/users", "POST", 5, false, "c1");

        let dash = svc.analytics_dashboard();
        assert!(dash
            .performance_insights
            .contains(&"VALIDATION WORKING: 2 validation failures blocked invalid data".to_string()));
    }

    #[test]
    fn endpoint_rows_sorted_by_volume() {
        let svc = MonitoringService::new();
        svc.record_request("/api/users/{id}", "DELETE", 5, true, "r");
        for _ in 0..3 {
            svc.record_request("/api/users", "POST", 5, true, "r");
        }
        for _ in 0..2 {
            svc.record_request("/api/users/{id}", "GET", 5, true, "r");
        }

        let keys: Vec<String> = svc
            .analytics_dashboard()
            .endpoint_analytics
            .into_iter()
            .map(|r| r.endpoint)
            .collect();
        assert_eq!(
            keys,
            vec!["POST /api/users", "GET /api/users/{id}", "DELETE /api/users/{id}"]
        );
        assert_eq!(svc.endpoint_count(), 3);
    }

    #[test]
    fn recent_window_excludes_old_entries() {
        let now = Utc::now();
        let svc = MonitoringService::started_at(now - Duration::hours(2));
        svc.record_request_at("/api/users", "GET", 999, true, "old", now - Duration::minutes(30));
        for (i, ms) in [10, 20, 30, 40, 50].into_iter().enumerate() {
            svc.record_request_at(
                "/api/users",
                "GET",
                ms,
                true,
                &format!("new{i}"),
                now - Duration::minutes(1),
            );
        }

        let perf = svc.analytics_dashboard_at(now).performance_metrics;
        assert_eq!(perf.last_10_min_requests, 5);
        assert_eq!(perf.average_response_time_ms, Some(30.0));
        assert_eq!(perf.min_response_time_ms, Some(10));
        assert_eq!(perf.max_response_time_ms, Some(50));
        assert_eq!(perf.p50_response_time_ms, Some(30));
        assert_eq!(perf.p95_response_time_ms, Some(50));
        assert_eq!(perf.p99_response_time_ms, Some(50));
        assert!(perf.message.is_none());
    }

    #[test]
    fn only_stale_entries_means_no_recent_traffic() {
        let now = Utc::now();
        let svc = MonitoringService::started_at(now);
        svc.record_request_at("/api/users", "GET", 10, true, "r", now - Duration::minutes(11));

        let dash = svc.analytics_dashboard_at(now);
        assert_eq!(dash.performance_metrics.last_10_min_requests, 0);
        assert_eq!(
            dash.performance_metrics.message.as_deref(),
            Some("No requests in the last 10 minutes")
        );
        // Lifetime views still see the request
        assert_eq!(dash.system_overview.total_requests, 1);
        assert_eq!(dash.recent_activity.len(), 1);
    }

    #[test]
    fn recent_activity_is_newest_first_and_capped() {
        let base = Utc::now() - Duration::minutes(5);
        let svc = MonitoringService::started_at(base);
        for i in 0..30 {
            svc.record_request_at(
                "/api/users",
                "GET",
                i,
                i % 2 == 0,
                &format!("r{i}"),
                base + Duration::seconds(i),
            );
        }

        let activity = svc.analytics_dashboard().recent_activity;
        assert_eq!(activity.len(), 20);
        assert_eq!(activity[0].request_id, "r29");
        assert_eq!(activity[0].status, "ERROR");
        assert_eq!(activity[1].status, "SUCCESS");
        assert_eq!(activity[19].request_id, "r10");
        assert_eq!(
            activity[0].timestamp,
            (base + Duration::seconds(29)).format("%H:%M:%S").to_string()
        );
    }

    #[test]
    fn log_is_bounded() {
        let svc = MonitoringService::new();
        for i in 0..1_500 {
            svc.record_request("/api/users", "GET", 1, true, &format!("r{i}"));
        }
        let log = svc.request_log();
        assert_eq!(log.len(), REQUEST_LOG_CAPACITY);
        assert_eq!(log[0].request_id, "r500");
        assert_eq!(log[999].request_id, "r1499");
        assert_eq!(svc.total_requests(), 1_500);
    }

    #[test]
    fn negative_times_are_recorded_as_given() {
        let svc = MonitoringService::new();
        svc.record_request("/api/users", "GET", -5, true, "r");
        let row = &svc.analytics_dashboard().endpoint_analytics[0];
        assert_eq!(row.min_response_time_ms, -5);
        assert_eq!(row.max_response_time_ms, 0);
    }

    #[test]
    fn extreme_execution_times_do_not_break_the_dashboard() {
        let svc = MonitoringService::new();
        svc.record_request("/api/users", "GET", i64::MAX, true, "r1");
        svc.record_request("/api/users", "GET", 1, true, "r2");
        assert_eq!(svc.average_response_time_ms(), i64::MAX / 2);

        let dash = svc.analytics_dashboard();
        let perf = &dash.performance_metrics;
        assert_eq!(perf.last_10_min_requests, 2);
        assert_eq!(perf.max_response_time_ms, Some(i64::MAX));
        assert_eq!(
            perf.average_response_time_ms,
            Some((i64::MAX as f64 + 1.0) / 2.0)
        );
        assert_eq!(dash.endpoint_analytics[0].max_response_time_ms, i64::MAX);
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(Duration::seconds(59)), "0m");
        assert_eq!(format_uptime(Duration::minutes(42)), "42m");
        assert_eq!(format_uptime(Duration::minutes(61)), "1h 1m");
        assert_eq!(format_uptime(Duration::hours(26) + Duration::minutes(5)), "26h 5m");

        let svc = MonitoringService::started_at(Utc::now() - Duration::minutes(135));
        assert_eq!(svc.analytics_dashboard().system_overview.system_uptime, "2h 15m");
    }

    #[test]
    fn concurrent_recording_keeps_totals_consistent() {
        let svc = Arc::new(MonitoringService::new());
        let endpoints = ["/api/users", "/api/users/{id}", "/api/users/validate"];

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let svc = svc.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let endpoint = endpoints[(worker + i) % endpoints.len()];
                        svc.record_request(endpoint, "GET", i as i64, i % 4 != 0, "r");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let dash = svc.analytics_dashboard();
        assert_eq!(dash.system_overview.total_requests, 4_000);
        assert_eq!(dash.system_overview.total_errors, 1_000);
        let per_endpoint: u64 = dash.endpoint_analytics.iter().map(|r| r.total_requests).sum();
        assert_eq!(per_endpoint, 4_000);
        assert_eq!(svc.request_log().len(), REQUEST_LOG_CAPACITY);
    }
}
