//! Prometheus metrics for the HTTP surface.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `http_requests_total` | Counter | `method`, `route`, `status` |
//! | `http_request_duration_seconds` | Histogram | `method`, `route` |
//! | `http_requests_in_progress` | Gauge | `route` |
//!
//! `route` is the matched route pattern (for example
//! `/endpoint/{endpoint}/pages/{title:.*}`), never the raw path, so page
//! titles do not leak into label values.

pub mod middleware;

pub use middleware::RequestMetrics;

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Content type of the Prometheus text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Request metrics held in a registry of their own.
///
/// Cloning shares the underlying series.
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests_total: CounterVec,
    request_duration: HistogramVec,
    in_progress: GaugeVec,
}

impl HttpMetrics {
    pub fn new() -> MetricsResult<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests"),
            &["method", "route", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            ),
            &["method", "route"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let in_progress = GaugeVec::new(
            Opts::new(
                "http_requests_in_progress",
                "HTTP requests currently being handled",
            ),
            &["route"],
        )?;
        registry.register(Box::new(in_progress.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            in_progress,
        })
    }

    pub fn request_started(&self, route: &str) {
        self.in_progress.with_label_values(&[route]).inc();
    }

    /// Record a finished request and release its in-progress slot.
    pub fn request_finished(&self, method: &str, route: &str, status: u16, elapsed_secs: f64) {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[method, route, status.as_str()])
            .inc();
        self.request_duration
            .with_label_values(&[method, route])
            .observe(elapsed_secs);
        self.in_progress.with_label_values(&[route]).dec();
    }

    /// Release an in-progress slot without recording an outcome.
    pub fn request_abandoned(&self, route: &str) {
        self.in_progress.with_label_values(&[route]).dec();
    }

    pub fn requests_total(&self, method: &str, route: &str, status: u16) -> f64 {
        self.requests_total
            .with_label_values(&[method, route, status.to_string().as_str()])
            .get()
    }

    pub fn duration_count(&self, method: &str, route: &str) -> u64 {
        self.request_duration
            .with_label_values(&[method, route])
            .get_sample_count()
    }

    pub fn in_progress(&self, route: &str) -> f64 {
        self.in_progress.with_label_values(&[route]).get()
    }

    /// Render every series in the Prometheus text format.
    pub fn encode_text(&self) -> MetricsResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}
