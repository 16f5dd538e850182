use atelier_app::domain::carts::{CartSettings, CartsService, PgCartsService};
use clap::{Args, Subcommand};
use jiff::Timestamp;

use super::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct CartsCommand {
    #[command(subcommand)]
    command: CartsSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartsSubcommand {
    /// Delete every expired cart now
    Sweep(DatabaseArgs),
}

pub(crate) async fn run(command: CartsCommand) -> Result<(), String> {
    match command.command {
        CartsSubcommand::Sweep(args) => {
            let service = PgCartsService::new(args.connect().await?, CartSettings::default());

            let deleted = service
                .delete_expired_carts(Timestamp::now())
                .await
                .map_err(|error| format!("failed to sweep carts: {error}"))?;

            println!("deleted_carts: {deleted}");

            Ok(())
        }
    }
}
