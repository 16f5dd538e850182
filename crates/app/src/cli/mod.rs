use atelier_app::database::{self, Db};
use clap::{Args, Parser, Subcommand};

mod carts;
mod catalog;
mod db;
mod discount;
mod inventory;

#[derive(Debug, Parser)]
#[command(name = "atelier-app", about = "Atelier storefront operator CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    Catalog(catalog::CatalogCommand),
    Discount(discount::DiscountCommand),
    Inventory(inventory::InventoryCommand),
    Carts(carts::CartsCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::Catalog(command) => catalog::run(command).await,
            Commands::Discount(command) => discount::run(command).await,
            Commands::Inventory(command) => inventory::run(command).await,
            Commands::Carts(command) => carts::run(command).await,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct DatabaseArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

impl DatabaseArgs {
    pub(crate) async fn connect(&self) -> Result<Db, String> {
        database::connect(&self.database_url, 2)
            .await
            .map(Db::new)
            .map_err(|error| format!("failed to connect to database: {error}"))
    }
}
