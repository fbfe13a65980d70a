use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
#[cfg(target_os = "linux")]
use prometheus::process_collector::ProcessCollector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

use crate::http_server::AppState;

lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    )
    .unwrap();
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("http_request_duration_seconds", "HTTP request duration in seconds").buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0
        ]),
        &["method", "endpoint"]
    )
    .unwrap();
    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGauge = IntGauge::new(
        "http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();
    pub static ref HTTP_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("http_errors_total", "Total number of HTTP errors"),
        &["method", "endpoint", "status"]
    )
    .unwrap();

    // Wallet proof metrics
    pub static ref TON_PROOF_CHECKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ton_proof_checks_total", "Total number of ton_proof verifications by outcome"),
        &["result"]
    )
    .unwrap();
    pub static ref IDENTITY_LINKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("identity_links_total", "Total number of wallet link/unlink outcomes"),
        &["code"]
    )
    .unwrap();

    // TonAPI metrics
    pub static ref TONAPI_CALLS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tonapi_calls_total", "Total number of TonAPI calls"),
        &["operation", "result"]
    )
    .unwrap();
    pub static ref TONAPI_CALL_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("tonapi_call_duration_seconds", "TonAPI call duration in seconds")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"]
    )
    .unwrap();
}

#[derive(Debug, Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        #[cfg(target_os = "linux")]
        {
            let process_collector = ProcessCollector::for_self();
            registry.register(Box::new(process_collector)).unwrap();
        }

        registry.register(Box::new(HTTP_REQUESTS_TOTAL.clone())).unwrap();
        registry.register(Box::new(HTTP_REQUEST_DURATION.clone())).unwrap();
        registry.register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone())).unwrap();
        registry.register(Box::new(HTTP_ERRORS_TOTAL.clone())).unwrap();

        registry.register(Box::new(TON_PROOF_CHECKS_TOTAL.clone())).unwrap();
        registry.register(Box::new(IDENTITY_LINKS_TOTAL.clone())).unwrap();

        registry.register(Box::new(TONAPI_CALLS_TOTAL.clone())).unwrap();
        registry.register(Box::new(TONAPI_CALL_DURATION.clone())).unwrap();

        Self {
            registry: Arc::new(registry),
        }
    }
}

/// Helper to normalize endpoints (remove numeric ids and query strings).
/// Example: /api/identity/123?x=1 -> api/identity/:id
pub fn normalize_path(path: &str) -> String {
    let path_only = path.split('?').next().unwrap_or(path);

    path_only
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| if s.parse::<i64>().is_ok() { ":id" } else { s })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware for tracking HTTP metrics
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if path == "/metrics" {
        return next.run(req).await;
    }

    let endpoint = normalize_path(&path);

    HTTP_REQUESTS_IN_FLIGHT.inc();
    let start = Instant::now();

    let response = next.run(req).await;

    HTTP_REQUEST_DURATION
        .with_label_values(&[method.as_str(), &endpoint])
        .observe(start.elapsed().as_secs_f64());

    let status = response.status();
    let status_str = status.as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), &endpoint, &status_str])
        .inc();

    if status.is_client_error() || status.is_server_error() {
        HTTP_ERRORS_TOTAL
            .with_label_values(&[method.as_str(), &endpoint, &status_str])
            .inc();
    }

    HTTP_REQUESTS_IN_FLIGHT.dec();

    response
}

/// Records a proof verification outcome. `result` is `"valid"` or the name of the failed step.
pub fn track_proof_check(result: &str) {
    TON_PROOF_CHECKS_TOTAL.with_label_values(&[result]).inc();
}

pub fn track_identity_link(code: &str) {
    IDENTITY_LINKS_TOTAL.with_label_values(&[code]).inc();
}

/// Wraps a TonAPI request, recording its duration and whether it failed.
pub async fn track_tonapi_call<T, E, F>(operation: &str, f: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = Instant::now();

    let result = f.await;

    TONAPI_CALL_DURATION
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());

    let outcome = if result.is_ok() { "ok" } else { "error" };
    TONAPI_CALLS_TOTAL.with_label_values(&[operation, outcome]).inc();

    result
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Failed to encode metrics"),
        );
    }

    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!("Metrics output is not valid utf-8: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("Failed to encode metrics"),
            )
        }
    }
}
