//! App Context

use std::{sync::Arc, time::Duration};

use atelier::pricing::{FlatRateTax, NoTax, TaxPolicy};
use clap::ValueEnum;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    database::{self, Db},
    domain::{
        carts::{CartSettings, CartsService, PgCartsService},
        catalog::{CatalogService, PgCatalogService},
        checkout::{CheckoutService, PgCheckoutService},
        discounts::{DiscountsService, PgDiscountsService},
        inventory::{InventoryService, PgInventoryService},
        orders::{OrderSettings, OrdersService, PgOrdersService},
        reconciler::{PgReconcilerService, ReconcilerService},
    },
    notifications::{
        NotificationSink, Notifier,
        queue::NotificationQueue,
        sinks::{PgNotificationSink, TracingSink},
    },
    payments::{
        PaymentGateway, PaymentGatewayError,
        card::{CardProcessorConfig, CardProcessorGateway},
        marketplace::{MarketplaceConfig, MarketplaceRedirectGateway},
        mock::MockGateway,
    },
    scheduler::{CartExpirySweep, Job, JobsService, Scheduler},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to apply migrations")]
    Migrations(#[source] sqlx::migrate::MigrateError),

    #[error("invalid payment gateway configuration")]
    Gateway(#[source] PaymentGatewayError),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

/// Which payment gateway serves checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GatewayKind {
    /// In-memory gateway for local development.
    #[default]
    Mock,
    /// Stripe-compatible card processor.
    Card,
    /// Third-party marketplace checkout.
    Marketplace,
}

#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    pub gateway: GatewayKind,
    pub card: CardProcessorConfig,
    pub marketplace: MarketplaceConfig,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
    pub payments: PaymentsConfig,
    pub currency: String,

    /// Flat tax rate in basis points; zero charges no tax.
    pub tax_rate_basis_points: u32,

    pub cart_ttl: Duration,
    pub low_stock_threshold: u32,
    pub cart_sweep_interval: Duration,
    pub notification_capacity: usize,
}

#[derive(Clone)]
pub struct AppContext {
    pub carts: Arc<dyn CartsService>,
    pub catalog: Arc<dyn CatalogService>,
    pub inventory: Arc<dyn InventoryService>,
    pub discounts: Arc<dyn DiscountsService>,
    pub orders: Arc<dyn OrdersService>,
    pub checkout: Arc<dyn CheckoutService>,
    pub reconciler: Arc<dyn ReconcilerService>,
    pub jobs: Arc<dyn JobsService>,
}

/// Workers started alongside the context. They stop when the shutdown token fires.
pub struct BackgroundTasks {
    scheduler: Arc<Scheduler>,
    notifications: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Stop the scheduler, then wait for queued notifications to drain.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;

        if let Err(error) = self.notifications.await {
            tracing::warn!(%error, "notification worker ended abnormally");
        }
    }
}

impl AppContext {
    /// Connect to the database, select the payment gateway and start background workers.
    ///
    /// # Errors
    ///
    /// Returns an error when the database is unreachable, migrations fail or the payment gateway
    /// configuration is unusable.
    pub async fn from_config(
        config: AppConfig,
        shutdown: &CancellationToken,
    ) -> Result<(Self, BackgroundTasks), AppInitError> {
        let pool = database::connect(&config.database_url, config.max_connections)
            .await
            .map_err(AppInitError::Database)?;

        if config.run_migrations {
            database::migrate(&pool)
                .await
                .map_err(AppInitError::Migrations)?;
        }

        let db = Db::new(pool);
        let gateway = build_gateway(config.payments.gateway, &config.payments)?;

        tracing::info!(gateway = gateway.name(), "payment gateway selected");

        let sinks: Vec<Arc<dyn NotificationSink>> = vec![
            Arc::new(TracingSink),
            Arc::new(PgNotificationSink::new(db.clone())),
        ];

        let (queue, notifications) = NotificationQueue::start(
            config.notification_capacity,
            sinks,
            shutdown.child_token(),
        );
        let notifier: Arc<dyn Notifier> = Arc::new(queue);

        let tax_policy: Arc<dyn TaxPolicy> = match config.tax_rate_basis_points {
            0 => Arc::new(NoTax),
            rate => Arc::new(FlatRateTax::new(rate)),
        };

        let carts: Arc<dyn CartsService> = Arc::new(PgCartsService::new(
            db.clone(),
            CartSettings {
                ttl: config.cart_ttl,
                currency: config.currency.clone(),
                tax_policy: tax_policy.clone(),
            },
        ));

        let discounts: Arc<dyn DiscountsService> = Arc::new(PgDiscountsService::new(db.clone()));

        let orders: Arc<dyn OrdersService> = Arc::new(PgOrdersService::new(
            db.clone(),
            OrderSettings {
                currency: config.currency,
                tax_policy,
                gateway_timeout: config.payments.timeout,
                low_stock_threshold: config.low_stock_threshold,
            },
            gateway.clone(),
            notifier.clone(),
        ));

        let scheduler = Arc::new(Scheduler::new(
            vec![Arc::new(CartExpirySweep::new(carts.clone(), config.cart_sweep_interval))
                as Arc<dyn Job>],
            shutdown.child_token(),
        ));

        scheduler.start();

        let context = Self {
            catalog: Arc::new(PgCatalogService::new(db.clone())),
            inventory: Arc::new(PgInventoryService::new(db.clone())),
            checkout: Arc::new(PgCheckoutService::new(
                carts.clone(),
                discounts.clone(),
                orders.clone(),
            )),
            reconciler: Arc::new(PgReconcilerService::new(
                db,
                gateway,
                notifier,
                config.payments.timeout,
            )),
            jobs: scheduler.clone(),
            carts,
            discounts,
            orders,
        };

        Ok((
            context,
            BackgroundTasks {
                scheduler,
                notifications,
            },
        ))
    }
}

/// Build the gateway named by `kind`.
///
/// # Errors
///
/// Returns an error when the selected gateway is missing required settings.
pub fn build_gateway(
    kind: GatewayKind,
    config: &PaymentsConfig,
) -> Result<Arc<dyn PaymentGateway>, AppInitError> {
    match kind {
        GatewayKind::Mock => Ok(Arc::new(MockGateway::new(1, false))),
        GatewayKind::Card => {
            if config.card.secret_key.is_empty() {
                return Err(AppInitError::MissingConfig("card processor secret key"));
            }

            if config.card.webhook_secret.is_empty() {
                return Err(AppInitError::MissingConfig("card processor webhook secret"));
            }

            Ok(Arc::new(CardProcessorGateway::new(config.card.clone())))
        }
        GatewayKind::Marketplace => MarketplaceRedirectGateway::new(config.marketplace.clone())
            .map(|gateway| Arc::new(gateway) as Arc<dyn PaymentGateway>)
            .map_err(AppInitError::Gateway),
    }
}

#[cfg(test)]
mod tests {
    use crate::secrets::SecretString;

    use super::*;

    fn payments(kind: GatewayKind) -> PaymentsConfig {
        PaymentsConfig {
            gateway: kind,
            card: CardProcessorConfig {
                api_base: "https://api.stripe.com".to_string(),
                secret_key: SecretString::default(),
                webhook_secret: SecretString::new("whsec_test"),
            },
            marketplace: MarketplaceConfig {
                shop_url: "https://shop.example.com/checkout".to_string(),
                callback_url: None,
            },
            timeout: Duration::from_secs(15),
        }
    }

    #[test]
    fn gateway_kind_selects_implementation() -> Result<(), AppInitError> {
        assert_eq!(build_gateway(GatewayKind::Mock, &payments(GatewayKind::Mock))?.name(), "mock");
        assert_eq!(
            build_gateway(GatewayKind::Marketplace, &payments(GatewayKind::Marketplace))?.name(),
            "marketplace"
        );

        Ok(())
    }

    #[test]
    fn card_gateway_requires_secret_key() {
        let result = build_gateway(GatewayKind::Card, &payments(GatewayKind::Card));

        assert!(
            matches!(result, Err(AppInitError::MissingConfig(_))),
            "expected MissingConfig, got {:?}",
            result.err()
        );
    }

    #[test]
    fn invalid_shop_url_is_rejected() {
        let mut config = payments(GatewayKind::Marketplace);
        config.marketplace.shop_url = "not a url".to_string();

        let result = build_gateway(GatewayKind::Marketplace, &config);

        assert!(
            matches!(result, Err(AppInitError::Gateway(_))),
            "expected Gateway, got {:?}",
            result.err()
        );
    }
}
