//! Prometheus metrics for the withdrawal monitor.
//!
//! All metrics are aggregated in the [`Metrics`] struct for easy tracking and management.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Aggregated metrics for the withdrawal monitor.
///
/// Metrics are registered with the global metrics registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    /// Register metric descriptions with the global registry.
    fn register_descriptions() {
        // Fetch metrics
        describe_counter!(
            "monitor_fetches_total",
            "Total number of withdrawal list fetches completed"
        );
        describe_counter!(
            "monitor_fetches_failure_total",
            "Total number of failed withdrawal list fetches"
        );
        describe_counter!(
            "monitor_fetches_stale_total",
            "Total number of fetch responses dropped because a newer fetch was issued"
        );
        describe_histogram!(
            "monitor_fetch_duration_seconds",
            "Duration of each withdrawal list fetch in seconds"
        );

        // Row metrics
        describe_gauge!(
            "monitor_withdrawal_rows",
            "Number of withdrawals in the merged list"
        );
        describe_counter!(
            "monitor_withdrawals_new_total",
            "Total number of newly observed withdrawal keys"
        );
        describe_gauge!(
            "monitor_scan_status",
            "Number of withdrawals by scan status"
        );

        // Operator metrics
        describe_counter!(
            "monitor_qr_shown_total",
            "Total number of payment QR codes shown"
        );
        describe_counter!(
            "monitor_scans_done_total",
            "Total number of withdrawals marked as scanned"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Fetch metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Record a completed fetch.
    pub fn record_fetch(&self, success: bool, duration: Duration) {
        counter!("monitor_fetches_total").increment(1);
        histogram!("monitor_fetch_duration_seconds").record(duration.as_secs_f64());

        if !success {
            counter!("monitor_fetches_failure_total").increment(1);
        }
    }

    /// Record a response dropped as stale.
    pub fn record_stale_fetch(&self) {
        counter!("monitor_fetches_stale_total").increment(1);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Row metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Set the merged row count and record newly seen keys.
    pub fn record_rows(&self, total: usize, new_keys: usize) {
        gauge!("monitor_withdrawal_rows").set(total as f64);
        counter!("monitor_withdrawals_new_total").increment(new_keys as u64);
    }

    /// Set the count of withdrawals by scan status.
    pub fn set_scan_status(&self, status: &str, count: usize) {
        gauge!("monitor_scan_status", "status" => status.to_string()).set(count as f64);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Operator metrics
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn record_qr_shown(&self) {
        counter!("monitor_qr_shown_total").increment(1);
    }

    pub fn record_scan_done(&self) {
        counter!("monitor_scans_done_total").increment(1);
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
