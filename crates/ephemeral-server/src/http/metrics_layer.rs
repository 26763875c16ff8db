//! Request counting middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Record method, route template, status and latency of every request.
///
/// Requests that hit no route are labelled `unmatched`.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    // Route template, not the raw path, to keep label cardinality bounded.
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;

    state.http_metrics.record(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed(),
    );
    response
}
