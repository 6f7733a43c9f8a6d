//! # Prometheus Metrics
//!
//! Operational metrics for the ledger node, scraped at `/metrics` on the
//! configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `diabot` prefix so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    core::Collector, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metric handles for the node. Prometheus handles are internally
/// reference-counted, so clones update the same series.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Blocks appended through the API.
    pub blocks_appended_total: IntCounter,
    /// Appends rejected with an error.
    pub append_failures_total: IntCounter,
    /// Current number of blocks in the chain, genesis included.
    pub chain_length: IntGauge,
    /// Full-chain validations performed.
    pub chain_validations_total: IntCounter,
    /// Validations that found a violation.
    pub chain_validation_failures_total: IntCounter,
    /// Append latency, persistence included.
    pub append_latency_seconds: Histogram,
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("diabot".into()), None)
            .expect("failed to create prometheus registry");

        let blocks_appended_total = register(
            &registry,
            IntCounter::new("blocks_appended_total", "Total number of blocks appended")
                .expect("metric creation"),
        );
        let append_failures_total = register(
            &registry,
            IntCounter::new(
                "append_failures_total",
                "Total number of appends rejected with an error",
            )
            .expect("metric creation"),
        );
        let chain_length = register(
            &registry,
            IntGauge::new("chain_length", "Number of blocks in the chain, genesis included")
                .expect("metric creation"),
        );
        let chain_validations_total = register(
            &registry,
            IntCounter::new(
                "chain_validations_total",
                "Total number of full-chain validations",
            )
            .expect("metric creation"),
        );
        let chain_validation_failures_total = register(
            &registry,
            IntCounter::new(
                "chain_validation_failures_total",
                "Total number of validations that found an integrity violation",
            )
            .expect("metric creation"),
        );
        let append_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "append_latency_seconds",
                    "Block append latency in seconds, persistence included",
                )
                .buckets(vec![
                    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
                ]),
            )
            .expect("metric creation"),
        );

        Self {
            registry,
            blocks_appended_total,
            append_failures_total,
            chain_length,
            chain_validations_total,
            chain_validation_failures_total,
            append_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> C {
    registry
        .register(Box::new(collector.clone()))
        .expect("metric registration");
    collector
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
