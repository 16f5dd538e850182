//! Scheduler Config

use clap::Args;

/// Background job and cart lifetime settings.
#[derive(Debug, Args)]
pub struct SchedulerConfig {
    /// Seconds between cart-expiry sweeps
    #[arg(long, env = "CART_SWEEP_INTERVAL_SECONDS", default_value_t = 3_600)]
    pub cart_sweep_interval_seconds: u64,

    /// Hours a cart lives after it is created
    #[arg(long, env = "CART_TTL_HOURS", default_value_t = 720)]
    pub cart_ttl_hours: u64,

    /// Emit a low-stock notification when a reservation leaves this many units or fewer
    #[arg(long, env = "LOW_STOCK_THRESHOLD", default_value_t = 2)]
    pub low_stock_threshold: u32,

    /// Notifications buffered before new events are dropped
    #[arg(long, env = "NOTIFICATION_QUEUE_CAPACITY", default_value_t = 1_024)]
    pub notification_queue_capacity: usize,
}
