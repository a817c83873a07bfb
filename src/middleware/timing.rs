use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const RESPONSE_TIME_HEADER: &str = "x-response-time-us";
const SERVER_TIMING_HEADER: &str = "server-timing";

/// Caller-supplied ids longer than this are replaced.
const MAX_REQUEST_ID_LEN: usize = 64;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Id of the request currently being served, if running under
/// [`timing_middleware`].
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_owned()
}

/// Wraps every routed request.
///
/// Assigns the request id (reusing a sane `X-Request-Id` from the caller)
/// and makes it visible to handlers through [`current_request_id`], so the
/// envelope, the monitor's request log and the access log share it. On the
/// way out it echoes the id and stamps `X-Response-Time-Us` and
/// `Server-Timing` with the full wall time, extraction and serialization
/// included.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let request_id = caller_request_id(req.headers()).unwrap_or_else(new_request_id);
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = REQUEST_ID.scope(request_id.clone(), next.run(req)).await;
    let elapsed = start.elapsed();

    stamp_headers(response.headers_mut(), &request_id, elapsed);

    if !is_access_logged(&path) {
        return response;
    }
    let status = response.status();
    let elapsed_us = elapsed.as_micros() as u64;
    if status.is_server_error() {
        tracing::warn!(%request_id, %method, %path, status = status.as_u16(), elapsed_us, "request");
    } else {
        tracing::info!(%request_id, %method, %path, status = status.as_u16(), elapsed_us, "request");
    }
    response
}

fn caller_request_id(headers: &HeaderMap) -> Option<String> {
    let id = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let usable = !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    usable.then(|| id.to_owned())
}

fn stamp_headers(headers: &mut HeaderMap, request_id: &str, elapsed: Duration) {
    if let Ok(val) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, val);
    }
    headers.insert(RESPONSE_TIME_HEADER, HeaderValue::from(elapsed.as_micros() as u64));
    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = HeaderValue::from_str(&server_timing) {
        headers.insert(SERVER_TIMING_HEADER, val);
    }
}

/// API calls only; the SSE feed holds its response open for its lifetime.
fn is_access_logged(path: &str) -> bool {
    path.starts_with("/api/") && !path.ends_with("/stream")
}
