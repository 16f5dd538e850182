//! Payments Config

use atelier_app::{
    context::GatewayKind,
    payments::{card::CardProcessorConfig, marketplace::MarketplaceConfig},
    secrets::SecretString,
};
use clap::Args;

/// Payment gateway and pricing settings.
#[derive(Debug, Args)]
pub struct PaymentsSettings {
    /// Gateway serving checkout (mock, card, marketplace)
    #[arg(long, env = "PAYMENT_GATEWAY", value_enum, default_value_t = GatewayKind::Mock)]
    pub payment_gateway: GatewayKind,

    /// Card processor API base URL
    #[arg(long, env = "CARD_API_BASE", default_value = "https://api.stripe.com")]
    pub card_api_base: String,

    /// Card processor secret key
    #[arg(long, env = "CARD_SECRET_KEY", hide_env_values = true, default_value = "")]
    pub card_secret_key: SecretString,

    /// Card processor webhook signing secret
    #[arg(long, env = "CARD_WEBHOOK_SECRET", hide_env_values = true, default_value = "")]
    pub card_webhook_secret: SecretString,

    /// Marketplace checkout page buyers are redirected to
    #[arg(
        long,
        env = "MARKETPLACE_SHOP_URL",
        default_value = "https://marketplace.example.com/checkout"
    )]
    pub marketplace_shop_url: String,

    /// Where the marketplace sends buyers after payment
    #[arg(long, env = "MARKETPLACE_CALLBACK_URL")]
    pub marketplace_callback_url: Option<String>,

    /// ISO 4217 currency every cart and order is priced in
    #[arg(long, env = "STORE_CURRENCY", default_value = "EUR")]
    pub currency: String,

    /// Flat tax rate in basis points (2000 = 20%); 0 charges no tax
    #[arg(long, env = "TAX_RATE_BASIS_POINTS", default_value_t = 0)]
    pub tax_rate_basis_points: u32,

    /// Upper bound on a single gateway call
    #[arg(long, env = "PAYMENT_GATEWAY_TIMEOUT_MS", default_value_t = 15_000)]
    pub gateway_timeout_ms: u64,
}

impl PaymentsSettings {
    pub(crate) fn card_config(&self) -> CardProcessorConfig {
        CardProcessorConfig {
            api_base: self.card_api_base.clone(),
            secret_key: self.card_secret_key.clone(),
            webhook_secret: self.card_webhook_secret.clone(),
        }
    }

    pub(crate) fn marketplace_config(&self) -> MarketplaceConfig {
        MarketplaceConfig {
            shop_url: self.marketplace_shop_url.clone(),
            callback_url: self.marketplace_callback_url.clone(),
        }
    }
}
