//! Per-request metrics middleware.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

use crate::services::metrics::HTTP_REQUESTS_TOTAL;

/// Count requests by method, matched route and response status. The matched
/// route template is used instead of the raw path to keep label cardinality
/// bounded.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), &path, response.status().as_str()])
        .inc();

    response
}
