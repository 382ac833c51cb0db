//! Request tracing for the redirect and management endpoints.

use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Unit for the `latency` field of response and failure events.
const LATENCY_UNIT: LatencyUnit = LatencyUnit::Millis;

/// Trace layer type used by [`crate::routes::app_router`].
pub type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>>;

/// Builds the HTTP trace layer.
///
/// Every request gets an `INFO` span carrying method, URI and version.
/// Request start is logged at `DEBUG` so that redirect traffic does not
/// double the log volume; the response line carries status and latency
/// in milliseconds. 5xx responses are additionally logged at `ERROR`.
///
/// ```text
/// INFO request{method=GET uri=/aB3xY9kQ version=HTTP/1.1}: finished processing request latency=1 ms status=302
/// ```
pub fn layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LATENCY_UNIT),
        )
        .on_failure(
            DefaultOnFailure::new()
                .level(Level::ERROR)
                .latency_unit(LATENCY_UNIT),
        )
}
