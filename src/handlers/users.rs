use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::envelope::{ApiResponse, Pagination};
use crate::store::{query, PageRequest, User, UserFilter};
use crate::validation::{UserInput, ValidationResult};
use crate::AppState;

use super::{AppError, Reply, RequestScope};

// Route templates, used as monitoring keys
const USERS: &str = "/api/users";
const USER_BY_ID: &str = "/api/users/{id}";
const SEARCH: &str = "/api/users/search";
const VALIDATE: &str = "/api/users/validate";
const CHECK_EMAIL: &str = "/api/users/check-email";

const BLOCKED_DOMAIN_WARNING: &str = "Email domain is not allowed by enterprise policy";

// ─── Payloads ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Deletion {
    pub id: u64,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAvailability {
    pub email: String,
    pub exists: bool,
    pub available: bool,
    pub domain_allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    #[serde(flatten)]
    pub result: ValidationResult,
    pub summary: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub direction: Option<String>,
}

impl ListParams {
    fn is_paged(&self) -> bool {
        self.page.is_some() || self.size.is_some()
    }

    fn page_request(&self) -> PageRequest {
        PageRequest::from_raw(
            self.page,
            self.size,
            self.sort_by.as_deref(),
            self.direction.as_deref(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub email_domain: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub direction: Option<String>,
}

impl SearchParams {
    fn split(self) -> (UserFilter, PageRequest) {
        let request = PageRequest::from_raw(
            self.page,
            self.size,
            self.sort_by.as_deref(),
            self.direction.as_deref(),
        );
        let filter = UserFilter {
            first_name: self.first_name,
            last_name: self.last_name,
            min_age: self.min_age,
            max_age: self.max_age,
            email_domain: self.email_domain,
        };
        (filter, request)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

/// Plain success, or success carrying warnings when there are any.
fn success_with_warnings<T>(data: T, message: &str, warnings: Vec<String>) -> ApiResponse<T> {
    if warnings.is_empty() {
        ApiResponse::success_with_message(data, message)
    } else {
        ApiResponse::success_with_validation(data, message, warnings)
    }
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::bad_request(
        "INVALID_REQUEST",
        format!("Invalid request body: {}", rejection.body_text()),
    )
}

fn invalid_id(rejection: PathRejection) -> AppError {
    AppError::bad_request(
        "INVALID_PARAMETER",
        format!("Invalid user id: {}", rejection.body_text()),
    )
}

fn invalid_query(rejection: QueryRejection) -> AppError {
    AppError::bad_request(
        "INVALID_PARAMETER",
        format!("Invalid query parameters: {}", rejection.body_text()),
    )
}

// ─── POST /api/users ─────────────────────────────────────────────

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Reply<User> {
    let mut scope = RequestScope::begin(&state.monitoring, "POST", USERS);

    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => return scope.fail(invalid_body(rejection)),
    };

    let candidate = match input.into_new_user() {
        Ok(user) => user,
        Err(errors) => {
            return scope.finish(
                StatusCode::BAD_REQUEST,
                ApiResponse::validation_error("Basic validation failed", errors),
            )
        }
    };

    let report = state.validator.validate_user(&candidate);
    if !report.valid {
        return scope.finish(
            StatusCode::BAD_REQUEST,
            ApiResponse::validation_error_with_warnings(
                "Enterprise validation failed",
                report.errors,
                report.warnings,
            ),
        );
    }

    match state.users.insert(candidate, Utc::now()).await {
        Ok(user) => {
            tracing::info!(
                id = user.id,
                name = %user.full_name(),
                request_id = scope.request_id(),
                "user created"
            );
            scope.succeed();
            scope.finish(
                StatusCode::CREATED,
                success_with_warnings(
                    user,
                    "User created successfully with enterprise validation",
                    report.warnings,
                ),
            )
        }
        Err(e) => scope.fail(AppError::storage("create user")(e)),
    }
}

// ─── GET /api/users ──────────────────────────────────────────────

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Reply<Vec<User>> {
    let mut scope = RequestScope::begin(&state.monitoring, "GET", USERS);

    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return scope.fail(invalid_query(rejection)),
    };

    let users = match state.users.find_all().await {
        Ok(users) => users,
        Err(e) => return scope.fail(AppError::storage("retrieve users")(e)),
    };

    scope.succeed();
    if !params.is_paged() {
        let message = format!("Users retrieved successfully ({} found)", users.len());
        return scope.finish(StatusCode::OK, ApiResponse::success_with_message(users, message));
    }

    let page = query::paginate(users, &UserFilter::default(), &params.page_request());
    let pagination = Pagination::of(&page);
    let message = format!(
        "Users retrieved successfully (page {} of {})",
        page.page + 1,
        page.total_pages().max(1)
    );
    scope.finish(
        StatusCode::OK,
        ApiResponse::success_with_message(page.content, message).with_pagination(pagination),
    )
}

// ─── GET /api/users/search ───────────────────────────────────────

pub async fn search_users(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Reply<Vec<User>> {
    let mut scope = RequestScope::begin(&state.monitoring, "GET", SEARCH);

    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return scope.fail(invalid_query(rejection)),
    };
    let (filter, request) = params.split();

    let users = match state.users.find_all().await {
        Ok(users) => users,
        Err(e) => return scope.fail(AppError::storage("search users")(e)),
    };

    let page = query::paginate(users, &filter, &request);
    let pagination = Pagination::of(&page);
    let message = format!("Search completed ({} matching users)", page.total_elements);

    scope.succeed();
    scope.finish(
        StatusCode::OK,
        ApiResponse::success_with_message(page.content, message).with_pagination(pagination),
    )
}

// ─── GET /api/users/:id ──────────────────────────────────────────

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Reply<User> {
    let mut scope = RequestScope::begin(&state.monitoring, "GET", USER_BY_ID);

    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return scope.fail(invalid_id(rejection)),
    };

    match state.users.find_by_id(id).await {
        Ok(Some(user)) => {
            scope.succeed();
            scope.finish(
                StatusCode::OK,
                ApiResponse::success_with_message(user, "User retrieved successfully"),
            )
        }
        Ok(None) => scope.fail(AppError::NotFound(id)),
        Err(e) => scope.fail(AppError::storage("retrieve user")(e)),
    }
}

// ─── PUT /api/users/:id ──────────────────────────────────────────

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Reply<User> {
    let mut scope = RequestScope::begin(&state.monitoring, "PUT", USER_BY_ID);

    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return scope.fail(invalid_id(rejection)),
    };
    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => return scope.fail(invalid_body(rejection)),
    };

    let current = match state.users.find_by_id(id).await {
        Ok(Some(user)) => user,
        Ok(None) => return scope.fail(AppError::NotFound(id)),
        Err(e) => return scope.fail(AppError::storage("update user")(e)),
    };

    let candidate = match input.into_new_user() {
        Ok(user) => user,
        Err(errors) => {
            return scope.finish(
                StatusCode::BAD_REQUEST,
                ApiResponse::validation_error("Basic validation failed", errors),
            )
        }
    };

    let report = state.validator.validate_user_update(&current, &candidate);
    if !report.valid {
        return scope.finish(
            StatusCode::BAD_REQUEST,
            ApiResponse::validation_error_with_warnings(
                "Enterprise validation failed",
                report.errors,
                report.warnings,
            ),
        );
    }

    match state.users.update(id, candidate).await {
        Ok(user) => {
            tracing::info!(id, request_id = scope.request_id(), "user updated");
            scope.succeed();
            scope.finish(
                StatusCode::OK,
                success_with_warnings(
                    user,
                    "User updated successfully with enterprise validation",
                    report.warnings,
                ),
            )
        }
        Err(e) => scope.fail(AppError::storage("update user")(e)),
    }
}

// ─── DELETE /api/users/:id ───────────────────────────────────────

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Reply<Deletion> {
    let mut scope = RequestScope::begin(&state.monitoring, "DELETE", USER_BY_ID);

    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return scope.fail(invalid_id(rejection)),
    };

    match state.users.delete(id).await {
        Ok(()) => {
            tracing::info!(id, request_id = scope.request_id(), "user deleted");
            scope.succeed();
            scope.finish(
                StatusCode::OK,
                ApiResponse::success_with_message(
                    Deletion { id, deleted: true },
                    "User deleted successfully",
                ),
            )
        }
        Err(e) => scope.fail(AppError::storage("delete user")(e)),
    }
}

// ─── POST /api/users/validate ────────────────────────────────────

/// Dry run of the create checks. A body that fails validation is still
/// a successful call; only an unreadable body counts as a failure.
pub async fn validate_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Reply<ValidationReport> {
    let mut scope = RequestScope::begin(&state.monitoring, "POST", VALIDATE);

    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return scope.fail(AppError::bad_request(
                "VALIDATION_ERROR",
                format!("Failed to validate user data: {}", rejection.body_text()),
            ))
        }
    };

    let result = state.validator.validate_input(input);
    let message = if result.valid {
        "User data passes all enterprise validation checks"
    } else {
        "User data has validation issues"
    };
    let summary = result.summary();

    scope.succeed();
    scope.finish(
        StatusCode::OK,
        ApiResponse::success_with_message(ValidationReport { result, summary }, message),
    )
}

// ─── GET /api/users/check-email ──────────────────────────────────

pub async fn check_email(
    State(state): State<Arc<AppState>>,
    params: Result<Query<EmailQuery>, QueryRejection>,
) -> Reply<EmailAvailability> {
    let mut scope = RequestScope::begin(&state.monitoring, "GET", CHECK_EMAIL);

    let email = match params {
        Ok(Query(EmailQuery { email: Some(email) })) if !email.trim().is_empty() => {
            email.trim().to_owned()
        }
        Ok(_) => {
            return scope.fail(AppError::bad_request(
                "INVALID_PARAMETER",
                "Email parameter is required",
            ))
        }
        Err(rejection) => return scope.fail(invalid_query(rejection)),
    };

    let exists = match state.users.exists_by_email(&email).await {
        Ok(exists) => exists,
        Err(e) => return scope.fail(AppError::storage("check email availability")(e)),
    };
    let domain_allowed = state.validator.is_email_domain_allowed(&email);

    let message = if exists {
        "Email is already in use"
    } else {
        "Email is available"
    };
    let data = EmailAvailability {
        email,
        exists,
        available: !exists,
        domain_allowed,
    };
    let warnings = if domain_allowed {
        Vec::new()
    } else {
        vec![BLOCKED_DOMAIN_WARNING.to_owned()]
    };

    scope.succeed();
    scope.finish(StatusCode::OK, success_with_warnings(data, message, warnings))
}
