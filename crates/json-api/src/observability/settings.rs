//! Process-global observability runtime settings.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::ServerConfig;

use super::request::Surface;

const DEFAULT_SLOW_REQUEST_THRESHOLD_MS: u64 = 1_000;

const DEFAULT_SLOW_WEBHOOK_THRESHOLD_MS: u64 = 250;

static SLOW_REQUEST_THRESHOLD_MS: AtomicU64 = AtomicU64::new(DEFAULT_SLOW_REQUEST_THRESHOLD_MS);
static SLOW_WEBHOOK_THRESHOLD_MS: AtomicU64 = AtomicU64::new(DEFAULT_SLOW_WEBHOOK_THRESHOLD_MS);
static OTEL_PARENT_PROPAGATION_ENABLED: AtomicBool = AtomicBool::new(false);

pub(super) fn apply_runtime_config(config: &ServerConfig) {
    let observability = &config.observability;

    SLOW_REQUEST_THRESHOLD_MS.store(observability.slow_request_threshold_ms, Ordering::Relaxed);
    SLOW_WEBHOOK_THRESHOLD_MS.store(observability.slow_webhook_threshold_ms, Ordering::Relaxed);
    OTEL_PARENT_PROPAGATION_ENABLED.store(
        observability.otel_enabled && observability.otel_parent_propagation_enabled,
        Ordering::Relaxed,
    );
}

/// Webhook deliveries get a tighter budget: providers retry slow acknowledgements.
pub(super) fn slow_request_threshold_ms(surface: Surface) -> u64 {
    match surface {
        Surface::Webhooks => SLOW_WEBHOOK_THRESHOLD_MS.load(Ordering::Relaxed),
        _ => SLOW_REQUEST_THRESHOLD_MS.load(Ordering::Relaxed),
    }
}

pub(super) fn otel_parent_propagation_enabled() -> bool {
    OTEL_PARENT_PROPAGATION_ENABLED.load(Ordering::Relaxed)
}
