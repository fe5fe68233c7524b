//! Vehicle Price Predictor CLI
//!
//! A command-line tool for requesting price estimates and checking
//! the health of a running prediction server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{predict, status};

/// Vehicle Price Predictor CLI
#[derive(Parser)]
#[command(name = "carprice")]
#[command(author, version, about = "CLI for the Vehicle Price Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CARPRICE_API_URL env var)
    #[arg(long, env = "CARPRICE_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate the market price of a vehicle
    Predict(PredictArgs),

    /// Price a fixed set of reference vehicles
    Samples,

    /// Show server health
    Health,

    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args)]
pub struct PredictArgs {
    /// Year of manufacture
    #[arg(long)]
    pub yom: i32,

    /// Odometer reading in kilometres
    #[arg(long)]
    pub mileage: f64,

    /// Engine displacement in cc
    #[arg(long)]
    pub engine: f64,

    /// Manufacturer (e.g. Toyota)
    #[arg(long)]
    pub brand: String,

    /// Model name (e.g. Aqua)
    #[arg(long)]
    pub model: String,

    /// Transmission type (e.g. Auto, Manual)
    #[arg(long)]
    pub gear: String,

    /// Fuel type (e.g. Petrol, Diesel, Hybrid)
    #[arg(long)]
    pub fuel: String,

    /// Vehicle condition (e.g. Used, New)
    #[arg(long)]
    pub condition: String,

    /// Town where the vehicle is listed
    #[arg(long)]
    pub town: Option<String>,

    /// Air conditioning (1 or 0)
    #[arg(long, value_parser = flag_parser())]
    pub aircon: Option<i32>,

    /// Power steering (1 or 0)
    #[arg(long, value_parser = flag_parser())]
    pub ps: Option<i32>,

    /// Power mirror (1 or 0)
    #[arg(long, value_parser = flag_parser())]
    pub pm: Option<i32>,

    /// Power window (1 or 0)
    #[arg(long, value_parser = flag_parser())]
    pub pw: Option<i32>,

    /// Vehicle is under a lease
    #[arg(long)]
    pub leasing: bool,

    /// Listing year
    #[arg(long)]
    pub year_listed: Option<i32>,

    /// Listing month (1-12)
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..=12))]
    pub month_listed: Option<i32>,
}

fn flag_parser() -> clap::builder::RangedI64ValueParser<i32> {
    clap::value_parser!(i32).range(0..=1)
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Save the API URL used when no flag or env var is given
    SetApiUrl {
        /// Server base URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Loaded per command so that set-api-url can repair a broken file
    let flag = cli.api_url.as_deref();
    let client = || -> Result<client::ApiClient> {
        let api_url = config::Config::load_or_default().resolve_api_url(flag);
        client::ApiClient::new(&api_url)
    };

    match cli.command {
        Commands::Predict(args) => {
            predict::predict_price(&client()?, args.into(), cli.format).await?;
        }
        Commands::Samples => {
            predict::price_samples(&client()?, cli.format).await?;
        }
        Commands::Health => {
            status::show_health(&client()?, cli.format).await?;
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => {
                let saved = config::Config::load_or_default();
                let api_url = saved.resolve_api_url(flag);
                status::show_config(&saved, &api_url, cli.format)?;
            }
            ConfigCommands::SetApiUrl { url } => {
                url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid API URL: {}", e))?;
                let updated = config::Config {
                    api_url: Some(url.clone()),
                };
                let path = updated.save()?;
                output::print_success(&format!(
                    "API URL set to {} ({})",
                    url,
                    path.display()
                ));
            }
        },
    }

    Ok(())
}

impl From<PredictArgs> for client::PredictRequest {
    fn from(args: PredictArgs) -> Self {
        let mut request = client::PredictRequest::basic(
            args.yom,
            args.mileage,
            args.engine,
            &args.brand.to_uppercase(),
            &args.model.to_uppercase(),
            &args.gear,
            &args.fuel,
            &args.condition,
        );
        request.town = args.town;
        request.aircon = args.aircon;
        request.ps = args.ps;
        request.pm = args.pm;
        request.pw = args.pw;
        request.leasing = args.leasing.then_some(1);
        request.year_listed = args.year_listed;
        request.month_listed = args.month_listed;
        request
    }
}
