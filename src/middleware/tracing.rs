use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderMap, Method, Uri},
    middleware::Next,
    response::Response,
};
use opentelemetry::{
    global,
    trace::{Span, SpanKind, Status, Tracer},
    KeyValue,
};
use std::time::Instant;
use tracing::{info_span, Instrument};

/// Per-request OpenTelemetry server span plus a `tracing` span carrying a
/// request id, so log lines and exported traces line up.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start_time = Instant::now();

    // Unmatched requests (404s, static files) have no route template.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let tracer = global::tracer("http-server");
    let mut span = tracer
        .span_builder(format!("{} {}", method, route))
        .with_kind(SpanKind::Server)
        .start(&tracer);

    set_span_attributes(&mut span, &method, &uri, &route, request.headers());

    let tracing_span = info_span!(
        "http_request",
        method = %method,
        uri = %uri,
        route = %route,
        request_id = %uuid::Uuid::now_v7(),
        uid = tracing::field::Empty,
    );

    let response = next.run(request).instrument(tracing_span).await;

    let duration = start_time.elapsed();
    let status_code = response.status().as_u16();

    span.set_attribute(KeyValue::new("http.status_code", status_code as i64));
    span.set_attribute(KeyValue::new("http.response_time_ms", duration.as_millis() as i64));

    if status_code >= 500 {
        span.set_status(Status::Error {
            description: format!("HTTP {}", status_code).into(),
        });
    } else {
        span.set_status(Status::Ok);
    }

    tracing::debug!(
        method = %method,
        route = %route,
        status = status_code,
        elapsed_ms = duration.as_millis() as u64,
        "request finished"
    );

    span.end();
    response
}

fn set_span_attributes(
    span: &mut impl Span,
    method: &Method,
    uri: &Uri,
    route: &str,
    headers: &HeaderMap,
) {
    span.set_attribute(KeyValue::new("http.method", method.to_string()));
    span.set_attribute(KeyValue::new("http.url", uri.to_string()));
    span.set_attribute(KeyValue::new("http.route", route.to_string()));

    if let Some(ua) = headers.get("user-agent").and_then(|v| v.to_str().ok()) {
        span.set_attribute(KeyValue::new("http.user_agent", ua.to_string()));
    }

    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        span.set_attribute(KeyValue::new("http.client_ip", xff.to_string()));
    }

    if let Some(event_id) = event_id_from_path(uri.path()) {
        span.set_attribute(KeyValue::new("eventos.event_id", event_id.to_string()));
    }
}

/// Event id of an `/api/events/{id}/...` request.
fn event_id_from_path(path: &str) -> Option<&str> {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("api"), Some("events"), Some(id)) if uuid::Uuid::parse_str(id).is_ok() => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_from_path() {
        let id = "0190a5a4-7c1e-7a8b-9c3d-2e4f6a8b0c1d";
        assert_eq!(
            event_id_from_path(&format!("/api/events/{}/registrations/11144477735", id)),
            Some(id)
        );
        assert_eq!(event_id_from_path(&format!("/api/events/{}", id)), Some(id));
        assert_eq!(event_id_from_path("/api/events"), None);
        assert_eq!(event_id_from_path("/api/events/not-an-id"), None);
        assert_eq!(event_id_from_path("/health"), None);
    }
}
