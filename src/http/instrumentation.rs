//! Request instrumentation middleware.
//!
//! Logs every request on the way in and out and records its status and
//! latency, labeled by method, route and status code. The route label is the
//! matched route template, so arbitrary paths served by the fallback share
//! one series.

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::observability::metrics;

/// Route label for requests that matched no explicit route.
pub const FALLBACK_ROUTE: &str = "fallback";

fn route_label<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| FALLBACK_ROUTE.to_string())
}

pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let route = route_label(&request);

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        query = %query,
        "IN"
    );

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        query = %query,
        status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "OUT"
    );
    metrics::record_request(method.as_str(), &route, status, start);

    response
}
