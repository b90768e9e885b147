//! valuation-dashboard: valuation and growth screens for one ticker.
//!
//! Usage:
//!   valuation-dashboard valuation AAPL
//!   valuation-dashboard valuation AAPL --date 2024-03-01 --json
//!   valuation-dashboard growth MSFT

mod config;
mod render;

use analysis_orchestrator::DashboardOrchestrator;
use anyhow::Context;
use chrono::NaiveDate;
use config::DashboardConfig;
use fmp_client::FmpClient;

#[derive(Debug, Clone, PartialEq)]
enum Command {
    /// `date: None` means today
    Valuation { ticker: String, date: Option<NaiveDate> },
    Growth { ticker: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Cli {
    command: Command,
    json: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  valuation-dashboard valuation <TICKER> [--date YYYY-MM-DD] [--json]");
    eprintln!("  valuation-dashboard growth <TICKER> [--json]");
}

/// Parse the command line (program name first). `Ok(None)` means the
/// arguments do not name a known command and the usage text applies.
fn parse_args(args: &[String]) -> anyhow::Result<Option<Cli>> {
    let json = args.iter().any(|a| a == "--json");

    let date_arg = args
        .iter()
        .position(|a| a == "--date")
        .and_then(|i| args.get(i + 1));

    let positional: Vec<&str> = args
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, a)| !a.starts_with("--") && args[*i - 1] != "--date")
        .map(|(_, a)| a.as_str())
        .collect();

    let command = match positional.as_slice() {
        ["valuation", ticker, ..] => {
            let date = match date_arg {
                Some(raw) => Some(
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid --date {:?}, expected YYYY-MM-DD", raw))?,
                ),
                None => None,
            };
            Command::Valuation { ticker: ticker.to_string(), date }
        }
        ["growth", ticker, ..] => Command::Growth { ticker: ticker.to_string() },
        _ => return Ok(None),
    };

    Ok(Some(Cli { command, json }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "valuation_dashboard=info,fmp_client=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args)? {
        Some(cli) => cli,
        None => {
            print_usage();
            std::process::exit(2);
        }
    };

    let config = DashboardConfig::from_env()?;
    let orchestrator = DashboardOrchestrator::new(FmpClient::new(config.fmp), config.orchestrator);

    let output = match &cli.command {
        Command::Valuation { ticker, date } => {
            let report = match date {
                Some(date) => {
                    tracing::info!("Valuation screen for {} as of {}", ticker, date);
                    orchestrator.analyze_valuation_on(ticker, *date).await?
                }
                None => {
                    tracing::info!("Valuation screen for {}", ticker);
                    orchestrator.analyze_valuation(ticker).await?
                }
            };
            if cli.json {
                serde_json::to_string_pretty(&report)? + "\n"
            } else {
                render::render_valuation(&report)
            }
        }
        Command::Growth { ticker } => {
            tracing::info!("Growth screen for {}", ticker);
            let report = orchestrator.analyze_growth(ticker).await?;
            if cli.json {
                serde_json::to_string_pretty(&report)? + "\n"
            } else {
                render::render_growth(&report)
            }
        }
    };
    print!("{}", output);

    Ok(())
}
