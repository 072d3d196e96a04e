//! Portfolio fair value CLI
//!
//! Values a portfolio file against live Yahoo data or an offline market file,
//! and exposes the pricers for one-off checks.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use portfolio_fairvalue::models::{american_call, call_price, implied_volatility};
use portfolio_fairvalue::prelude::*;

/// Fair-value estimation for option and ETF portfolios
#[derive(Parser)]
#[command(name = "fairvalue")]
#[command(version)]
#[command(about = "Compare listed option premiums with model fair values")]
#[command(long_about = None)]
struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Value every position in a portfolio file
    Value {
        /// Portfolio JSON file
        #[arg(short, long)]
        portfolio: PathBuf,

        /// Offline market JSON file (live Yahoo data when omitted)
        #[arg(short, long)]
        market: Option<PathBuf>,

        /// Valuation date, YYYY-MM-DD (today when omitted)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Volatility fed into the lattice
        #[arg(long, value_enum)]
        vol_source: Option<VolSourceArg>,

        /// Fixed volatility for every option (e.g. 0.35); implies manual source
        #[arg(long)]
        manual_vol: Option<f64>,

        /// Volatility used when implied volatility cannot be solved
        #[arg(long)]
        fallback_vol: Option<f64>,

        /// Lattice steps
        #[arg(long)]
        steps: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Price a single call with both models
    Price {
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        strike: f64,
        /// Calendar days to expiry
        #[arg(long)]
        days: f64,
        #[arg(long, default_value = "0.045")]
        rate: f64,
        #[arg(long, default_value = "0.0")]
        div: f64,
        #[arg(long)]
        vol: f64,
        #[arg(long, default_value = "500")]
        steps: usize,
    },

    /// Solve implied volatility for a call premium
    Iv {
        /// Observed call premium
        #[arg(long)]
        price: f64,
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        strike: f64,
        /// Calendar days to expiry
        #[arg(long)]
        days: f64,
        #[arg(long, default_value = "0.045")]
        rate: f64,
        #[arg(long, default_value = "0.0")]
        div: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum VolSourceArg {
    Implied,
    Historical,
}

impl Cli {
    /// Initialize logging on stderr; stdout carries the report
    fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> FairValueResult<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match cli.command {
        Commands::Value {
            portfolio,
            market,
            as_of,
            vol_source,
            manual_vol,
            fallback_vol,
            steps,
            json,
        } => {
            let file = PortfolioFile::load(&portfolio)?;
            let mut config = file.valuation;

            match (manual_vol, vol_source) {
                (Some(vol), _) => config.volatility_source = VolatilitySource::Manual(vol),
                (None, Some(VolSourceArg::Implied)) => {
                    config.volatility_source = VolatilitySource::Implied
                }
                (None, Some(VolSourceArg::Historical)) => {
                    config.volatility_source = VolatilitySource::Historical
                }
                (None, None) => {}
            }
            if fallback_vol.is_some() {
                config.fallback_volatility = fallback_vol;
            }
            if let Some(steps) = steps {
                config.lattice = BinomialTree::new(steps);
            }
            config.validate()?;

            let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
            let valuator = PortfolioValuator::with_config(config);

            let report = match market {
                Some(path) => {
                    let data = StaticMarketData::load(path)?;
                    valuator.run(&file.positions, Collaborators::from_source(&data), as_of)
                }
                None => {
                    let yahoo = YahooClient::new()?;
                    valuator.run(&file.positions, Collaborators::from_source(&yahoo), as_of)
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_text(&report));
            }
            Ok(())
        }

        Commands::Price {
            spot,
            strike,
            days,
            rate,
            div,
            vol,
            steps,
        } => {
            let time = days / 365.0;
            let european = call_price(spot, strike, time, rate, vol, div);
            let american = american_call(spot, strike, time, rate, vol, div, steps)?;

            println!("Call Pricing:");
            println!("  Spot: ${:.2}", spot);
            println!("  Strike: ${:.2}", strike);
            println!("  Time: {:.0} days", days);
            println!("  Rate: {:.2}%", rate * 100.0);
            println!("  Div: {:.2}%", div * 100.0);
            println!("  Vol: {:.1}%\n", vol * 100.0);
            println!("  European (BSM): ${:.4}", european);
            println!("  American ({} steps): ${:.4}", steps, american);
            println!("  Early exercise premium: ${:.4}", american - european);
            Ok(())
        }

        Commands::Iv {
            price,
            spot,
            strike,
            days,
            rate,
            div,
        } => {
            let time = days / 365.0;
            let iv = implied_volatility(
                price,
                spot,
                strike,
                time,
                rate,
                div,
                &IvSolverConfig::default(),
            )?;
            println!("Implied volatility: {:.2}%", iv * 100.0);
            Ok(())
        }
    }
}
