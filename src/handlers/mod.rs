pub mod analytics;
pub mod users;

use axum::{http::StatusCode, Json};
use std::sync::Arc;
use std::time::Instant;

use crate::envelope::ApiResponse;
use crate::middleware::timing;
use crate::monitoring::MonitoringService;
use crate::store::StoreError;

/// Every handler answers with a status and an envelope.
pub type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

// ─── Per-request monitoring scope ────────────────────────────────

/// Opened at the top of every handler.
///
/// Owns the request id (the one the timing middleware assigned, or a fresh
/// one outside it) and start time. Reports the outcome to the monitor
/// when dropped, whichever way the handler exits; the outcome counts as a
/// failure unless `succeed()` was called.
pub struct RequestScope {
    monitoring: Arc<MonitoringService>,
    method: &'static str,
    endpoint: &'static str,
    request_id: String,
    started: Instant,
    success: bool,
}

impl RequestScope {
    pub fn begin(
        monitoring: &Arc<MonitoringService>,
        method: &'static str,
        endpoint: &'static str,
    ) -> Self {
        Self {
            monitoring: monitoring.clone(),
            method,
            endpoint,
            request_id: timing::current_request_id().unwrap_or_else(timing::new_request_id),
            started: Instant::now(),
            success: false,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn elapsed_ms(&self) -> i64 {
        self.started.elapsed().as_millis() as i64
    }

    pub fn succeed(&mut self) {
        self.success = true;
    }

    /// Stamp request id and execution time onto the envelope.
    pub fn finish<T>(&self, status: StatusCode, response: ApiResponse<T>) -> Reply<T> {
        (
            status,
            Json(
                response
                    .with_request_id(self.request_id.clone())
                    .with_execution_time(self.elapsed_ms()),
            ),
        )
    }

    pub fn fail<T>(&self, err: AppError) -> Reply<T> {
        if let AppError::Storage { .. } = err {
            tracing::warn!(
                request_id = %self.request_id,
                endpoint = self.endpoint,
                error = %err,
                "store operation failed"
            );
        }
        let mut response = ApiResponse::error(err.to_string(), err.code());
        if let Some(details) = err.details() {
            response = response.with_error_details(details);
        }
        self.finish(err.status(), response)
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.monitoring.record_request(
            self.endpoint,
            self.method,
            self.elapsed_ms(),
            self.success,
            &self.request_id,
        );
    }
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("User not found with id: {0}")]
    NotFound(u64),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("Failed to {action}: {source}")]
    Storage {
        action: &'static str,
        source: StoreError,
    },
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    /// Classify a store failure; `action` completes "Failed to ...".
    pub fn storage(action: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |err| match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::DuplicateEmail(_) => Self::Conflict(err.to_string()),
            source => Self::Storage { action, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured context for the error block, where there is any.
    pub fn details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let mut details = serde_json::Map::new();
        match self {
            Self::NotFound(id) => {
                details.insert("id".into(), (*id).into());
            }
            Self::Storage { action, .. } => {
                details.insert("action".into(), (*action).into());
            }
            Self::Conflict(_) | Self::BadRequest { .. } => return None,
        }
        Some(details)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "USER_NOT_FOUND",
            Self::Conflict(_) => "EMAIL_ALREADY_EXISTS",
            Self::BadRequest { code, .. } => code,
            Self::Storage { .. } => "DATA_ACCESS_ERROR",
        }
    }
}
