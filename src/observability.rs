use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: appointments booked.
pub const BOOKINGS_TOTAL: &str = "parlor_bookings_total";

/// Counter: booking attempts rejected by the conflict check.
pub const BOOKING_CONFLICTS_TOTAL: &str = "parlor_booking_conflicts_total";

/// Counter: appointments cancelled one at a time.
pub const CANCELLATIONS_TOTAL: &str = "parlor_cancellations_total";

/// Counter: appointments cancelled by a barber demotion cascade.
pub const CASCADE_CANCELLATIONS_TOTAL: &str = "parlor_cascade_cancellations_total";

/// Counter: ratings attached (including overwrites).
pub const RATINGS_TOTAL: &str = "parlor_ratings_total";

/// Counter: notification sends that failed and were swallowed.
pub const EMAIL_FAILURES_TOTAL: &str = "parlor_email_failures_total";

/// Histogram: conflict check + insert duration in seconds.
pub const BOOKING_WRITE_DURATION_SECONDS: &str = "parlor_booking_write_duration_seconds";

/// Install the Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init_metrics(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Install the default fmt tracing subscriber for the embedding service.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
