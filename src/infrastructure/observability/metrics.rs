//! Prometheus recorder and cache traffic counters

use axum::{extract::State, routing::get, Router};
use metrics::{counter, describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{error, info};

use super::config::MetricsConfig;

/// Outcome of one cache access made by the user service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Error,
}

impl CacheOutcome {
    const ALL: [CacheOutcome; 3] = [Self::Hit, Self::Miss, Self::Error];

    fn metric_name(self) -> &'static str {
        match self {
            Self::Hit => "user_cache_hits_total",
            Self::Miss => "user_cache_misses_total",
            Self::Error => "user_cache_errors_total",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Hit => "Reads answered from the cache",
            Self::Miss => "Reads that fell through to the store",
            Self::Error => "Cache calls that failed and were skipped",
        }
    }
}

/// Handle onto the installed recorder
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: PrometheusHandle,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder
///
/// Returns `None` when disabled or when a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        info!("Prometheus metrics disabled");
        return None;
    }

    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Failed to install Prometheus recorder");
            return None;
        }
    };

    for outcome in CacheOutcome::ALL {
        describe_counter!(outcome.metric_name(), outcome.description());
    }
    gauge!("user_records_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    info!(path = %config.path, "Prometheus metrics initialized");

    Some(PrometheusMetrics { handle })
}

/// Router serving the exposition at `path`
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(render_metrics))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<PrometheusMetrics>) -> String {
    metrics.render()
}

/// Count a cache access by entry kind (`point` | `page`) and service operation
pub fn record_cache_access(outcome: CacheOutcome, kind: &'static str, op: &'static str) {
    counter!(outcome.metric_name(), "kind" => kind, "op" => op).increment(1);
}
