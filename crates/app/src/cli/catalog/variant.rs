use atelier_app::domain::catalog::{
    CatalogService, PgCatalogService,
    models::{NewProductVariant, ProductUuid, VariantUuid},
};
use clap::Args;

use crate::cli::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct CreateVariantArgs {
    /// Product the variant belongs to
    #[arg(long)]
    product: ProductUuid,

    /// Variant SKU, unique across variants
    #[arg(long)]
    sku: String,

    /// Variant name, e.g. "A3 framed"
    #[arg(long)]
    name: String,

    /// Signed adjustment to the product base price, in minor units
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    price_adjustment: i64,

    /// Units on hand
    #[arg(long, default_value_t = 0)]
    stock: u32,

    #[command(flatten)]
    database: DatabaseArgs,
}

pub(crate) async fn run(args: CreateVariantArgs) -> Result<(), String> {
    let db = args.database.connect().await?;
    let service = PgCatalogService::new(db);

    let variant = service
        .create_variant(NewProductVariant {
            uuid: VariantUuid::new(),
            product_uuid: args.product,
            sku: args.sku,
            name: args.name,
            price_adjustment: args.price_adjustment,
            stock: args.stock,
        })
        .await
        .map_err(|error| format!("failed to create variant: {error}"))?;

    println!("variant_uuid: {}", variant.uuid);
    println!("sku: {}", variant.sku);
    println!("stock: {}", variant.stock);

    Ok(())
}
