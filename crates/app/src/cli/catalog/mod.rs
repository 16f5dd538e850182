use clap::{Args, Subcommand};

mod product;
mod variant;

#[derive(Debug, Args)]
pub(crate) struct CatalogCommand {
    #[command(subcommand)]
    command: CatalogSubcommand,
}

#[derive(Debug, Subcommand)]
enum CatalogSubcommand {
    /// Create a product
    Product(product::CreateProductArgs),
    /// Create a variant of an existing product
    Variant(variant::CreateVariantArgs),
}

pub(crate) async fn run(command: CatalogCommand) -> Result<(), String> {
    match command.command {
        CatalogSubcommand::Product(args) => product::run(args).await,
        CatalogSubcommand::Variant(args) => variant::run(args).await,
    }
}
