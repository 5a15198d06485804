use std::net::SocketAddr;

// ── Request-driven metrics ──────────────────────────────────────

/// Counter: reservations created.
pub const RESERVATIONS_CREATED_TOTAL: &str = "prenota_reservations_created_total";

/// Counter: reservations edited in place.
pub const RESERVATIONS_UPDATED_TOTAL: &str = "prenota_reservations_updated_total";

/// Counter: reservations deleted (cascading their invitations).
pub const RESERVATIONS_DELETED_TOTAL: &str = "prenota_reservations_deleted_total";

/// Counter: invitation accepts/declines recorded.
pub const INVITATION_REPLIES_TOTAL: &str = "prenota_invitation_replies_total";

/// Counter: requests rejected for a room or personal-schedule overlap.
pub const BOOKING_CONFLICTS_TOTAL: &str = "prenota_booking_conflicts_total";

// ── WAL metrics ─────────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "prenota_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "prenota_wal_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if the
/// port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
