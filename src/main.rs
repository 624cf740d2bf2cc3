//! Stamp duty command line and HTTP server.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stamp_duty_engine::affordability::solve_max_price;
use stamp_duty_engine::api::{create_router, AppState};
use stamp_duty_engine::calculation::DutyEngine;
use stamp_duty_engine::config::{ConfigLoader, RuleBook};
use stamp_duty_engine::models::{
    BuyerFlags, BuyerProfile, FinancingInput, FinancingPolicy, Jurisdiction,
};

#[derive(Parser)]
#[command(name = "stamp-duty")]
#[command(about = "Australian transfer duty and purchasing power calculator")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Load rule sets from this directory instead of the built-in copies
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Compute duty for one purchase
    Duty {
        /// Jurisdiction code (NSW, VIC, QLD, WA, SA, TAS, ACT, NT)
        jurisdiction: Jurisdiction,

        /// Purchase price in dollars
        price: Decimal,

        #[command(flatten)]
        buyer: BuyerArgs,
    },

    /// Find the highest affordable price
    MaxPrice {
        /// Jurisdiction code
        jurisdiction: Jurisdiction,

        /// Maximum loan the lender will advance
        #[arg(long)]
        borrowing_power: Decimal,

        /// Cash available for deposit, duty and costs
        #[arg(long)]
        cash: Decimal,

        /// Desired loan-to-value ratio
        #[arg(long, default_value = "0.80")]
        target_leverage: Decimal,

        /// Financing policy
        #[arg(long, value_enum, default_value = "no-insurance-cap")]
        policy: PolicyArg,

        /// Add registration and settlement costs
        #[arg(long)]
        include_fees: bool,

        /// Pay mortgage insurance from cash rather than the loan
        #[arg(long)]
        pay_insurance_in_cash: bool,

        /// Contract date (YYYY-MM-DD) for guarantee eligibility
        #[arg(long)]
        contract_date: Option<NaiveDate>,

        #[command(flatten)]
        buyer: BuyerArgs,
    },
}

#[derive(Args)]
struct BuyerArgs {
    /// The purchase is vacant land
    #[arg(long)]
    land: bool,

    /// The buyer will live in the property
    #[arg(long)]
    owner_occupier: bool,

    /// The buyer has never owned a home
    #[arg(long)]
    first_home: bool,

    /// Region within the jurisdiction, e.g. metro or regional
    #[arg(long)]
    region: Option<String>,
}

impl From<BuyerArgs> for BuyerFlags {
    fn from(args: BuyerArgs) -> Self {
        BuyerFlags {
            is_vacant_land: args.land,
            is_owner_occupier: args.owner_occupier,
            is_first_home_buyer: args.first_home,
            region: args.region,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    NoInsuranceCap,
    InsuranceAllowed,
    SubsidizedGuarantee,
}

impl From<PolicyArg> for FinancingPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::NoInsuranceCap => FinancingPolicy::NoInsuranceCap,
            PolicyArg::InsuranceAllowed => FinancingPolicy::InsuranceAllowed,
            PolicyArg::SubsidizedGuarantee => FinancingPolicy::SubsidizedGuarantee,
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn load_rules(config: Option<PathBuf>) -> CliResult<RuleBook> {
    let rules = match config {
        Some(path) => {
            info!(path = %path.display(), "Loading rule sets");
            ConfigLoader::load(path)?
        }
        None => ConfigLoader::builtin()?.clone(),
    };
    Ok(rules)
}

async fn run(cli: Cli) -> CliResult<()> {
    let rules = load_rules(cli.config)?;

    match cli.command {
        Commands::Serve { port } => {
            let router = create_router(AppState::new(rules));
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
            info!(port, "Listening");
            axum::serve(listener, router).await?;
        }
        Commands::Duty {
            jurisdiction,
            price,
            buyer,
        } => {
            let profile = BuyerProfile::new(jurisdiction, price, buyer.into());
            let assessment = DutyEngine::new(&rules).assess(&profile)?;
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }
        Commands::MaxPrice {
            jurisdiction,
            borrowing_power,
            cash,
            target_leverage,
            policy,
            include_fees,
            pay_insurance_in_cash,
            contract_date,
            buyer,
        } => {
            let input = FinancingInput {
                jurisdiction,
                flags: buyer.into(),
                borrowing_power,
                cash_on_hand: cash,
                target_leverage,
                financing_policy: policy.into(),
                include_ancillary_fees: include_fees,
                pay_insurance_in_cash,
                contract_date,
            };
            let result = solve_max_price(&rules, &input)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
