//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chaingit_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // GitHub upstream metrics
    pub static ref GITHUB_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chaingit_github_requests_total", "Total number of GitHub API requests"),
        &["operation", "status"]
    ).expect("metric can be created");
    pub static ref GITHUB_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "chaingit_github_request_duration_seconds",
            "GitHub API request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"]
    ).expect("metric can be created");

    // OAuth callback outcomes; only "success" mints a session
    pub static ref OAUTH_CALLBACKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chaingit_oauth_callbacks_total", "Total number of OAuth callback results"),
        &["outcome"]
    ).expect("metric can be created");

    // Session metrics
    pub static ref SESSIONS_SWEPT_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chaingit_sessions_swept_total", "Total number of sessions removed"),
        &["reason"]
    ).expect("metric can be created");
    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::new(
        "chaingit_sessions_active",
        "Current number of live sessions"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chaingit_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GITHUB_REQUESTS_TOTAL.clone()))
        .expect("GITHUB_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GITHUB_REQUEST_DURATION_SECONDS.clone()))
        .expect("GITHUB_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(OAUTH_CALLBACKS_TOTAL.clone()))
        .expect("OAUTH_CALLBACKS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_SWEPT_TOTAL.clone()))
        .expect("SESSIONS_SWEPT_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .expect("SESSIONS_ACTIVE can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
