//! # Internal Metrics
//!
//! Counters are emitted with the `metrics` macros at their call sites. This
//! module registers their descriptions and, when enabled, installs the
//! Prometheus recorder whose handle renders `GET /metrics`.

use anyhow::Result;
use metrics::Unit;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Registers descriptions for every metric the service emits.
pub fn describe() {
    metrics::describe_counter!("bookings_total", Unit::Count, "Booking submissions, labeled by outcome.");
    metrics::describe_counter!("bookings_persisted_total", Unit::Count, "Bookings accepted by the persistence backend.");
    metrics::describe_counter!("contact_inquiries_total", Unit::Count, "Contact inquiries, labeled by outcome.");
    metrics::describe_counter!("webhook_deliveries_total", Unit::Count, "Webhook delivery attempts, labeled by channel and outcome.");
    metrics::describe_counter!("handoffs_total", Unit::Count, "WhatsApp handoffs, labeled by outcome.");
    metrics::describe_counter!("handoff_rounds_total", Unit::Count, "Launch rounds run across all WhatsApp handoffs.");
    metrics::describe_counter!("outbox_flushes_total", Unit::Count, "Undelivered outbox records re-offered at startup.");
    metrics::describe_histogram!("http_request_duration_seconds", Unit::Seconds, "Intake request latency, labeled by route.");
}

/// Installs the global Prometheus recorder.
///
/// Only one recorder can be installed per process, so this fails if called
/// twice.
pub fn install() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()?;
    describe();
    Ok(handle)
}
