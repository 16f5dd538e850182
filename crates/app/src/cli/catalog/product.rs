use atelier_app::domain::catalog::{
    CatalogService, PgCatalogService,
    models::{NewProduct, ProductUuid},
};
use clap::Args;

use crate::cli::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct CreateProductArgs {
    /// Product title shown to buyers
    #[arg(long)]
    title: String,

    /// Stock keeping unit, unique across products
    #[arg(long)]
    sku: String,

    /// Base price in minor units
    #[arg(long)]
    price: u64,

    /// ISO 4217 currency code
    #[arg(long, default_value = "EUR")]
    currency: String,

    /// Optional product UUID; generated when omitted
    #[arg(long)]
    product_uuid: Option<ProductUuid>,

    #[command(flatten)]
    database: DatabaseArgs,
}

pub(crate) async fn run(args: CreateProductArgs) -> Result<(), String> {
    let db = args.database.connect().await?;
    let service = PgCatalogService::new(db);

    let product = service
        .create_product(NewProduct {
            uuid: args.product_uuid.unwrap_or_default(),
            title: args.title,
            sku: args.sku,
            base_price: args.price,
            currency: args.currency.to_uppercase(),
        })
        .await
        .map_err(|error| format!("failed to create product: {error}"))?;

    println!("product_uuid: {}", product.uuid);
    println!("sku: {}", product.sku);
    println!("base_price: {} {}", product.base_price, product.currency);

    Ok(())
}
