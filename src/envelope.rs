use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::Page;

pub const API_VERSION: &str = "v1.0";
pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
const DEFAULT_SUCCESS_MESSAGE: &str = "Request completed successfully";

// ─── Envelope ────────────────────────────────────────────────────

/// Standard wrapper around every API payload.
///
/// Only the named constructors build one, so a success never carries an
/// `error` block and an error never carries `data`. `meta.timestamp` is
/// stamped at construction; request id and execution time are attached
/// afterwards with the `with_*` setters.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetails>,
    meta: ResponseMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<ValidationInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<i64>,
    pub api_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationInfo {
    pub has_errors: bool,
    pub has_warnings: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_elements: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    pub fn of<T>(page: &Page<T>) -> Self {
        Self {
            current_page: page.page,
            total_pages: page.total_pages(),
            page_size: page.size,
            total_elements: page.total_elements,
            has_next: page.has_next(),
            has_previous: page.has_previous(),
        }
    }
}

impl ResponseMeta {
    fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: None,
            execution_time_ms: None,
            api_version: API_VERSION,
            pagination: None,
        }
    }
}

// ─── Constructors ────────────────────────────────────────────────

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, DEFAULT_SUCCESS_MESSAGE)
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
            meta: ResponseMeta::now(),
            validation: None,
        }
    }

    /// Success that still carries non-blocking warnings.
    pub fn success_with_validation(
        data: T,
        message: impl Into<String>,
        warnings: Vec<String>,
    ) -> Self {
        let mut response = Self::success_with_message(data, message);
        response.validation = Some(ValidationInfo {
            has_warnings: !warnings.is_empty(),
            warnings,
            ..ValidationInfo::default()
        });
        response
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            error: Some(ErrorDetails {
                code: code.into(),
                message: message.clone(),
                details: None,
            }),
            message,
            data: None,
            meta: ResponseMeta::now(),
            validation: None,
        }
    }

    pub fn validation_error(message: impl Into<String>, errors: Vec<String>) -> Self {
        let mut response = Self::error(message, VALIDATION_FAILED);
        response.validation = Some(ValidationInfo {
            has_errors: !errors.is_empty(),
            errors,
            ..ValidationInfo::default()
        });
        response
    }

    /// Errors block the operation; warnings ride along for context.
    pub fn validation_error_with_warnings(
        message: impl Into<String>,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        let mut response = Self::validation_error(message, errors);
        if let Some(validation) = response.validation.as_mut() {
            validation.has_warnings = !warnings.is_empty();
            validation.warnings = warnings;
        }
        response
    }

    // ── Chained metadata ────────────────────────────────────────

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        debug_assert!(self.meta.request_id.is_none(), "request id set twice");
        self.meta.request_id = Some(request_id.into());
        self
    }

    pub fn with_execution_time(mut self, execution_time_ms: i64) -> Self {
        debug_assert!(
            self.meta.execution_time_ms.is_none(),
            "execution time set twice"
        );
        self.meta.execution_time_ms = Some(execution_time_ms);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.meta.pagination = Some(pagination);
        self
    }

    /// Extra structured context for an error. Ignored on successes.
    pub fn with_error_details(
        mut self,
        details: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.details = Some(details);
        }
        self
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error_details(&self) -> Option<&ErrorDetails> {
        self.error.as_ref()
    }

    pub fn meta(&self) -> &ResponseMeta {
        &self.meta
    }

    pub fn validation(&self) -> Option<&ValidationInfo> {
        self.validation.as_ref()
    }
}
