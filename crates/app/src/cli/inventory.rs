use atelier_app::domain::{
    catalog::models::VariantUuid,
    inventory::{InventoryService, PgInventoryService},
};
use clap::{Args, Subcommand};

use super::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct InventoryCommand {
    #[command(subcommand)]
    command: InventorySubcommand,
}

#[derive(Debug, Subcommand)]
enum InventorySubcommand {
    /// Restock or write off units of a variant
    Adjust(AdjustArgs),
    /// Print the stock level of a variant
    Show(ShowArgs),
}

#[derive(Debug, Args)]
struct AdjustArgs {
    #[arg(long)]
    variant: VariantUuid,

    /// Units to add; negative to remove
    #[arg(long, allow_hyphen_values = true)]
    delta: i64,

    #[command(flatten)]
    database: DatabaseArgs,
}

#[derive(Debug, Args)]
struct ShowArgs {
    #[arg(long)]
    variant: VariantUuid,

    #[command(flatten)]
    database: DatabaseArgs,
}

pub(crate) async fn run(command: InventoryCommand) -> Result<(), String> {
    match command.command {
        InventorySubcommand::Adjust(args) => {
            let service = PgInventoryService::new(args.database.connect().await?);

            let stock = service
                .adjust_stock(args.variant, args.delta)
                .await
                .map_err(|error| format!("failed to adjust stock: {error}"))?;

            println!("variant_uuid: {}", args.variant);
            println!("stock: {stock}");
        }
        InventorySubcommand::Show(args) => {
            let service = PgInventoryService::new(args.database.connect().await?);

            let stock = service
                .stock_level(args.variant)
                .await
                .map_err(|error| format!("failed to read stock: {error}"))?;

            println!("stock: {stock}");
        }
    }

    Ok(())
}
