//! Leaderboard metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<LeaderboardMetricsInner> = OnceLock::new();

struct LeaderboardMetricsInner {
    operations: CounterVec,
    errors: CounterVec,
}

impl LeaderboardMetricsInner {
    fn new() -> Self {
        Self {
            operations: CounterVec::new(
                Opts::new(
                    "leaderboard_operations_total",
                    "Total leaderboard operations",
                ),
                &["operation"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new("leaderboard_errors_total", "Total leaderboard errors"),
                &["operation", "kind"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.operations.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static LeaderboardMetricsInner {
    METRICS.get_or_init(LeaderboardMetricsInner::new)
}

/// Leaderboard metrics wrapper
#[derive(Clone, Default)]
pub struct LeaderboardMetrics;

impl LeaderboardMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_operation(&self, operation: &str) {
        get_metrics()
            .operations
            .with_label_values(&[operation])
            .inc();
    }

    pub fn record_error(&self, operation: &str, kind: &str) {
        get_metrics()
            .errors
            .with_label_values(&[operation, kind])
            .inc();
    }

    pub fn operation_count(&self, operation: &str) -> f64 {
        get_metrics()
            .operations
            .with_label_values(&[operation])
            .get()
    }
}
