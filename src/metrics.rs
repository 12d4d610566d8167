use crate::AnalysisRecord;
use axum::{http::StatusCode, response::IntoResponse};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Metrics recorder already initialized");
                return;
            }

            // Initialize metrics with zero values
            counter!("whois_analyses_total", "tld" => "unknown").absolute(0);
            counter!("whois_analysis_flags_total", "flag" => "none").absolute(0);
            counter!("whois_request_errors_total", "error_type" => "unknown").absolute(0);
            histogram!("whois_analysis_duration_seconds").record(0.0);
        }
        Err(e) => {
            tracing::error!("Failed to install metrics recorder: {}", e);
        }
    }
}

pub fn increment_analyses(domain: &str) {
    counter!("whois_analyses_total", "tld" => extract_tld(domain)).increment(1);
}

/// One increment per flag set on the record, or `flag="none"` for a clean
/// result.
pub fn record_flags(record: &AnalysisRecord) {
    let active = record.flags.active();
    if active.is_empty() {
        counter!("whois_analysis_flags_total", "flag" => "none").increment(1);
    }
    for flag in active {
        counter!("whois_analysis_flags_total", "flag" => flag).increment(1);
    }
}

pub fn increment_errors(error_type: &str) {
    counter!("whois_request_errors_total", "error_type" => error_type.to_string()).increment(1);
}

pub fn record_query_time(duration_ms: u64) {
    let duration_seconds = duration_ms as f64 / 1000.0;
    histogram!("whois_analysis_duration_seconds").record(duration_seconds);
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized".to_string()),
    }
}

fn extract_tld(domain: &str) -> String {
    domain
        .rsplit('.')
        .next()
        .filter(|tld| !tld.is_empty())
        .unwrap_or("unknown")
        .to_lowercase()
}
