//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the runtime:
//! - Dispatch outcomes (sync, async, failed) and call latency
//! - Reconciliation throughput, pending transactions and protocol violations
//!
//! Recording is always on; the numbers only leave the process once a
//! [`MetricsServer`] has installed the Prometheus recorder.
//!
//! # Example
//!
//! ```rust,no_run
//! use optimistic_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! if let Some(text) = server.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// The HTTP listener needs a Tokio runtime to run on
    #[error("Metrics server must be started from within a Tokio runtime")]
    NoRuntime,
}

/// Prometheus metrics server.
///
/// Installs the global Prometheus recorder, serves it over HTTP and renders
/// the scrape text on demand.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address the scrape endpoint listens on (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions, install the Prometheus recorder and
    /// serve `GET /metrics` on the configured address.
    ///
    /// Must be called from within a Tokio runtime: the HTTP listener runs as a
    /// spawned task.
    ///
    /// # Errors
    ///
    /// Returns error if there is no Tokio runtime, or if the exporter cannot be
    /// built (for example when the address is already bound).
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a warning
    /// and succeeds without a handle or listener.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MetricsError::NoRuntime)?;
        register_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
            return Ok(());
        }

        let addr = self.addr;
        runtime.spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(%addr, "Metrics listener stopped");
            }
        });

        self.handle = Some(handle);
        tracing::info!(addr = %self.addr, "Serving metrics at http://{}/metrics", self.addr);
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Dispatch Metrics
    describe_counter!(
        "optimistic_dispatch_sync_total",
        "Total number of commands dispatched as sync actions"
    );
    describe_counter!(
        "optimistic_dispatch_async_total",
        "Total number of commands dispatched as async transactions"
    );
    describe_counter!(
        "optimistic_dispatch_failed_total",
        "Total number of async transactions that resolved as failed"
    );
    describe_histogram!(
        "optimistic_call_duration_seconds",
        "Time taken by external calls, including timeouts"
    );

    // Reconciliation Metrics
    describe_counter!(
        "optimistic_reconcile_actions_total",
        "Total number of actions applied by the store"
    );
    describe_counter!(
        "optimistic_reconcile_violations_total",
        "Total number of reconciliation protocol violations"
    );
    describe_gauge!(
        "optimistic_pending_transactions",
        "Number of async transactions awaiting resolution"
    );
    describe_histogram!(
        "optimistic_reconcile_duration_seconds",
        "Time taken to reconcile one action"
    );
}

/// Dispatch metrics recorder.
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a sync dispatch.
    pub fn record_sync() {
        counter!("optimistic_dispatch_sync_total").increment(1);
    }

    /// Record the start of an async transaction.
    pub fn record_async() {
        counter!("optimistic_dispatch_async_total").increment(1);
    }

    /// Record a transaction resolved as failed.
    pub fn record_failure() {
        counter!("optimistic_dispatch_failed_total").increment(1);
    }

    /// Record the duration of an external call.
    pub fn record_call(duration: Duration) {
        histogram!("optimistic_call_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Reconciliation metrics recorder.
pub struct ReconcileMetrics;

impl ReconcileMetrics {
    /// Record an applied action and the resulting log length.
    pub fn record_action(duration: Duration, pending: usize) {
        counter!("optimistic_reconcile_actions_total").increment(1);
        histogram!("optimistic_reconcile_duration_seconds").record(duration.as_secs_f64());
        // Note: Precision loss acceptable for metrics (pending counts < 2^52)
        #[allow(clippy::cast_precision_loss)]
        gauge!("optimistic_pending_transactions").set(pending as f64);
    }

    /// Record a protocol violation.
    pub fn record_violation() {
        counter!("optimistic_reconcile_violations_total").increment(1);
    }
}
