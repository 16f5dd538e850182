//! Server configuration module

use std::time::Duration;

use atelier_app::context::{AppConfig, PaymentsConfig};
use clap::Parser;

use crate::config::{
    admin::AdminConfig,
    db::DatabaseConfig,
    observability::{LoggingConfig, ObservabilityConfig},
    payments::PaymentsSettings,
    scheduler::SchedulerConfig,
    server::ServerRuntimeConfig,
};

pub(crate) mod admin;
pub(crate) mod db;
pub(crate) mod observability;
pub(crate) mod payments;
pub(crate) mod scheduler;
pub(crate) mod server;

/// Atelier JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "atelier-json", about = "Atelier storefront JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Observability (traces/metrics) settings.
    #[command(flatten)]
    pub observability: ObservabilityConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Payment gateway and pricing settings.
    #[command(flatten)]
    pub payments: PaymentsSettings,

    /// Background job settings.
    #[command(flatten)]
    pub scheduler: SchedulerConfig,

    /// Admin API settings.
    #[command(flatten)]
    pub admin: AdminConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }

    /// Settings handed to the application context.
    #[must_use]
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database.database_url.clone(),
            max_connections: self.database.max_connections,
            run_migrations: self.database.run_migrations,
            payments: PaymentsConfig {
                gateway: self.payments.payment_gateway,
                card: self.payments.card_config(),
                marketplace: self.payments.marketplace_config(),
                timeout: Duration::from_millis(self.payments.gateway_timeout_ms),
            },
            currency: self.payments.currency.to_uppercase(),
            tax_rate_basis_points: self.payments.tax_rate_basis_points,
            cart_ttl: Duration::from_secs(self.scheduler.cart_ttl_hours.saturating_mul(3_600)),
            low_stock_threshold: self.scheduler.low_stock_threshold,
            cart_sweep_interval: Duration::from_secs(self.scheduler.cart_sweep_interval_seconds),
            notification_capacity: self.scheduler.notification_queue_capacity,
        }
    }
}
