use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

// ── Booking flow ────────────────────────────────────────────────

/// Counter: booking requests created.
pub const BOOKINGS_CREATED_TOTAL: &str = "tandem_bookings_created_total";

/// Counter: persisted accept/reject decisions. Labels: to.
pub const TRANSITIONS_TOTAL: &str = "tandem_transitions_total";

/// Counter: ratings stored.
pub const RATINGS_TOTAL: &str = "tandem_ratings_total";

/// Counter: optimistic list entries restored after a failed write.
pub const OPTIMISTIC_REVERTS_TOTAL: &str = "tandem_optimistic_reverts_total";

// ── Notifications ───────────────────────────────────────────────

/// Counter: lifecycle events dropped before dispatch. Labels: reason.
pub const EVENTS_DROPPED_TOTAL: &str = "tandem_events_dropped_total";

/// Counter: push messages handed to the notifier.
pub const NOTIFICATIONS_SENT_TOTAL: &str = "tandem_notifications_sent_total";

/// Counter: lifecycle events that produced no message. Labels: reason.
pub const NOTIFICATIONS_FAILED_TOTAL: &str = "tandem_notifications_failed_total";

// ── Journal ─────────────────────────────────────────────────────

/// Histogram: journal group-commit duration in seconds.
pub const JOURNAL_COMMIT_DURATION_SECONDS: &str = "tandem_journal_commit_duration_seconds";

/// Histogram: events per journal commit.
pub const JOURNAL_BATCH_SIZE: &str = "tandem_journal_batch_size";

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), String> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus metrics exporter: {e}"))?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
