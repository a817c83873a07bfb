use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers::{analytics, users};
use crate::middleware::timing;
use crate::monitoring::stream;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── User CRUD ───────────────────────────────────────────
        .route("/api/users", post(users::create_user).get(users::list_users))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // ── Queries and validation ──────────────────────────────
        .route("/api/users/search", get(users::search_users))
        .route("/api/users/validate", post(users::validate_user))
        .route("/api/users/check-email", get(users::check_email))
        // ── Statistics and reports ──────────────────────────────
        .route("/api/users/stats", get(analytics::user_stats))
        .route("/api/users/reports/summary", get(analytics::summary_report))
        .route("/api/users/reports/growth", get(analytics::growth_report))
        // ── Analytics ───────────────────────────────────────────
        .route("/api/users/analytics", get(analytics::analytics_dashboard))
        .route("/api/users/analytics/stream", get(stream::analytics_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
