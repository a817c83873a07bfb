use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::AppState;

// ─── GET /api/users/analytics/stream ─────────────────────────────
/// Server-Sent Events feed of the analytics dashboard.
/// Pushes a full `AnalyticsSnapshot` as JSON every 500 ms.
/// Not recorded by the monitor, otherwise the feed would report itself.

pub async fn analytics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshot = state.monitoring.analytics_dashboard();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().event("analytics").data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
