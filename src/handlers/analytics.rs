use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use std::sync::Arc;

use crate::envelope::ApiResponse;
use crate::monitoring::AnalyticsSnapshot;
use crate::store::reports::{self, GrowthReport, UserStats, UserSummaryReport};
use crate::AppState;

use super::{AppError, Reply, RequestScope};

const STATS: &str = "/api/users/stats";
const REPORT_SUMMARY: &str = "/api/users/reports/summary";
const REPORT_GROWTH: &str = "/api/users/reports/growth";
const ANALYTICS: &str = "/api/users/analytics";

// ─── GET /api/users/analytics ────────────────────────────────────

/// The snapshot is taken before this request is recorded, so a
/// dashboard never counts the call that fetched it.
pub async fn analytics_dashboard(State(state): State<Arc<AppState>>) -> Reply<AnalyticsSnapshot> {
    let mut scope = RequestScope::begin(&state.monitoring, "GET", ANALYTICS);
    let snapshot = state.monitoring.analytics_dashboard();

    scope.succeed();
    scope.finish(
        StatusCode::OK,
        ApiResponse::success_with_message(
            snapshot,
            "API analytics dashboard retrieved successfully",
        ),
    )
}

// ─── GET /api/users/stats ────────────────────────────────────────

pub async fn user_stats(State(state): State<Arc<AppState>>) -> Reply<UserStats> {
    let mut scope = RequestScope::begin(&state.monitoring, "GET", STATS);

    match state.users.find_all().await {
        Ok(users) => {
            scope.succeed();
            scope.finish(
                StatusCode::OK,
                ApiResponse::success_with_message(
                    reports::stats(&users, Utc::now()),
                    "User statistics retrieved successfully",
                ),
            )
        }
        Err(e) => scope.fail(AppError::storage("get statistics")(e)),
    }
}

// ─── GET /api/users/reports/summary ──────────────────────────────

pub async fn summary_report(State(state): State<Arc<AppState>>) -> Reply<UserSummaryReport> {
    let mut scope = RequestScope::begin(&state.monitoring, "GET", REPORT_SUMMARY);

    match state.users.find_all().await {
        Ok(users) => {
            scope.succeed();
            scope.finish(
                StatusCode::OK,
                ApiResponse::success_with_message(
                    reports::summary(&users, Utc::now()),
                    "User summary report generated successfully",
                ),
            )
        }
        Err(e) => scope.fail(AppError::storage("generate summary report")(e)),
    }
}

// ─── GET /api/users/reports/growth ───────────────────────────────

pub async fn growth_report(State(state): State<Arc<AppState>>) -> Reply<GrowthReport> {
    let mut scope = RequestScope::begin(&state.monitoring, "GET", REPORT_GROWTH);

    match state.users.find_all().await {
        Ok(users) => {
            scope.succeed();
            scope.finish(
                StatusCode::OK,
                ApiResponse::success_with_message(
                    reports::growth(&users, Utc::now()),
                    "User growth report generated successfully",
                ),
            )
        }
        Err(e) => scope.fail(AppError::storage("generate growth report")(e)),
    }
}
