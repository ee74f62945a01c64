//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use axum::{routing::get, Router};
use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Metrics prefix for all knowledge base metrics
pub const METRICS_PREFIX: &str = "supporthub_kb";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_list_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total article list/search queries"
    );

    describe_counter!(
        format!("{}_article_views_total", METRICS_PREFIX),
        Unit::Count,
        "Total article detail views"
    );

    describe_counter!(
        format!("{}_article_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Total article create/update/delete operations"
    );

    tracing::info!("Metrics registered");
}

/// Build the `/metrics` scrape endpoint, installing the Prometheus
/// recorder. If a recorder is already installed the endpoint is disabled
/// rather than failing startup.
pub fn metrics_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder; /metrics disabled");
            Router::new()
        }
    }
}

/// Record a list/search query
pub fn record_list_query(filtered: bool) {
    counter!(
        format!("{}_list_queries_total", METRICS_PREFIX),
        "filtered" => filtered.to_string()
    )
    .increment(1);
}

/// Record an article detail view
pub fn record_article_view() {
    counter!(format!("{}_article_views_total", METRICS_PREFIX)).increment(1);
}

/// Record a successful article mutation
pub fn record_article_write(action: &'static str) {
    counter!(
        format!("{}_article_writes_total", METRICS_PREFIX),
        "action" => action
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_does_not_panic() {
        record_list_query(true);
        record_article_view();
        record_article_write("created");
    }
}
