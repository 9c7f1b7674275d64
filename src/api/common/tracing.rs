//! Request/response tracing for versioned routes.
//!
//! Plugged into `tower_http::trace::TraceLayer`; the spans carry the
//! `Accept` header that drove negotiation and the responses log the
//! `Content-Type` it produced.

use axum::http::{header, Request, Response};
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tracing::{info_span, Level, Span};

fn header_str<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Creates the span for a request, keyed on its negotiation inputs.
pub fn make_custom_span<B>(request: &Request<B>) -> Span {
    let request_id = header_str(request.headers(), "x-request-id");

    info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri().path(),
        query = ?request.uri().query(),
        request_id = request_id,
        accept = ?request.headers().get(header::ACCEPT),
        content_type = ?request.headers().get(header::CONTENT_TYPE),
        user_agent = ?request.headers().get(header::USER_AGENT),
    )
}

pub fn on_custom_request<B>(request: &Request<B>, _span: &Span) {
    tracing::debug!(
        method = %request.method(),
        uri = %request.uri(),
        accept = header_str(request.headers(), header::ACCEPT.as_str()),
        "Incoming HTTP request"
    );
}

/// Logs the outcome at a level matching the status class.
pub fn on_custom_response<B>(response: &Response<B>, latency: Duration, _span: &Span) {
    let status = response.status();
    let latency_ms = latency.as_millis();
    let content_type = header_str(response.headers(), header::CONTENT_TYPE.as_str());

    let log_level = match status.as_u16() {
        400..=499 => Level::WARN,
        500..=599 => Level::ERROR,
        _ => Level::INFO,
    };

    match log_level {
        Level::WARN => tracing::warn!(
            status = %status,
            latency_ms = latency_ms,
            content_type = content_type,
            "HTTP request completed with client error"
        ),
        Level::ERROR => tracing::error!(
            status = %status,
            latency_ms = latency_ms,
            content_type = content_type,
            "HTTP request completed with server error"
        ),
        _ => tracing::info!(
            status = %status,
            latency_ms = latency_ms,
            content_type = content_type,
            "HTTP request completed successfully"
        ),
    }
}

pub fn on_custom_failure(error: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
    let error_type = match &error {
        ServerErrorsFailureClass::StatusCode(code) => format!("HTTP {}", code.as_u16()),
        ServerErrorsFailureClass::Error(_) => "Internal Error".to_string(),
    };

    tracing::error!(
        error = ?error,
        latency_ms = latency.as_millis(),
        error_type = error_type,
        "HTTP request failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn missing_headers_read_as_unknown() {
        let request = Request::builder()
            .uri("/user")
            .header(header::ACCEPT, "application/vnd.example.user.v1+json")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            header_str(request.headers(), "accept"),
            "application/vnd.example.user.v1+json"
        );
        assert_eq!(header_str(request.headers(), "x-request-id"), "unknown");
    }
}
