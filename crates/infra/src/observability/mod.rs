//! Observability for the catalog pipeline
//!
//! Metrics are lock-free atomic counters recorded in-process. Recording
//! methods return `MetricsResult<()>` so limits can be added later without an
//! API break; today they always succeed.

pub mod metrics;

pub use metrics::{CatalogMetrics, CatalogMetricsSnapshot};

/// Metrics error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    /// Nothing recorded yet for a derived metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData { metric: &'static str },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Log a failed metric write instead of dropping it.
pub fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        tracing::warn!(metric, error = ?err, "failed to record metric");
    }
}
