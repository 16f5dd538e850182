use atelier::discounts::DiscountKind;
use atelier_app::domain::discounts::{
    DiscountsService, PgDiscountsService,
    models::{DiscountCodeUuid, NewDiscountCode},
};
use clap::{Args, Subcommand};
use jiff::Timestamp;

use super::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct DiscountCommand {
    #[command(subcommand)]
    command: DiscountSubcommand,
}

#[derive(Debug, Subcommand)]
enum DiscountSubcommand {
    /// Create a discount code
    Create(CreateDiscountArgs),
}

#[derive(Debug, Args)]
struct CreateDiscountArgs {
    /// Code buyers enter at checkout; matched case-insensitively
    #[arg(long)]
    code: String,

    /// `percentage` or `fixed_amount`
    #[arg(long)]
    kind: DiscountKind,

    /// Basis points for percentage codes (1000 = 10%), minor units for fixed codes
    #[arg(long)]
    value: u64,

    /// Smallest subtotal the code applies to, in minor units
    #[arg(long, default_value_t = 0)]
    min_purchase: u64,

    /// Maximum redemptions; unlimited when omitted
    #[arg(long)]
    max_uses: Option<u64>,

    /// RFC 3339 timestamp the code becomes valid
    #[arg(long)]
    starts_at: Option<Timestamp>,

    /// RFC 3339 timestamp the code stops being valid
    #[arg(long)]
    expires_at: Option<Timestamp>,

    /// Create the code switched off
    #[arg(long)]
    inactive: bool,

    #[command(flatten)]
    database: DatabaseArgs,
}

pub(crate) async fn run(command: DiscountCommand) -> Result<(), String> {
    match command.command {
        DiscountSubcommand::Create(args) => create(args).await,
    }
}

async fn create(args: CreateDiscountArgs) -> Result<(), String> {
    let db = args.database.connect().await?;
    let service = PgDiscountsService::new(db);

    let discount = service
        .create_discount_code(NewDiscountCode {
            uuid: DiscountCodeUuid::new(),
            code: args.code,
            kind: args.kind,
            value: args.value,
            min_purchase: args.min_purchase,
            max_uses: args.max_uses,
            starts_at: args.starts_at,
            expires_at: args.expires_at,
            active: !args.inactive,
        })
        .await
        .map_err(|error| format!("failed to create discount code: {error}"))?;

    println!("discount_uuid: {}", discount.uuid);
    println!("code: {}", discount.code);
    println!("kind: {}", discount.rule.kind);
    println!("active: {}", discount.rule.active);

    Ok(())
}
