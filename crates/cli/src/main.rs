//! ticker-lens CLI - watchlist rows, detail charts and symbol search as JSON

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ticker_lens_core::models::chart::ChartRange;
use ticker_lens_core::models::settings::Settings;
use ticker_lens_core::TickerLens;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_FILTER: &str = "ticker_lens_core=info,ticker_lens=info";

#[derive(Parser)]
#[command(name = "ticker-lens")]
#[command(about = "Stock watchlist indicators, sentiment and charts", long_about = None)]
struct Cli {
    /// Settings JSON file; environment variables still override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build watchlist rows for one or more symbols
    Watchlist {
        #[arg(value_name = "SYMBOL", required = true)]
        symbols: Vec<String>,
    },
    /// Row and indexed chart for a single symbol
    Detail {
        #[arg(value_name = "SYMBOL")]
        symbol: String,

        /// Chart range: 1M, 6M, 1Y, 5Y or MAX
        #[arg(short, long, default_value = "MAX")]
        range: ChartRange,
    },
    /// Search symbols across providers
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Show configured keys and registered providers
    Diag,
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            Settings::from_json(&json)?
        }
        None => Settings::default(),
    };
    settings.apply_env(|name| std::env::var(name).ok());
    Ok(settings)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref())?;
    let lens = TickerLens::new(settings)?;

    match cli.command {
        Commands::Watchlist { symbols } => {
            let report = lens.build_watchlist_rows(&symbols).await;
            info!(
                "{} of {} symbols live, {} degraded, {} omitted",
                report.live_count,
                report.total_count,
                report.degraded_count(),
                report.omitted_count()
            );
            print_json(&report, cli.pretty)?;
        }
        Commands::Detail { symbol, range } => {
            let detail = lens.build_detail_range(&symbol, range).await;
            if detail.row.is_none() {
                anyhow::bail!("no data for {symbol}");
            }
            print_json(&detail, cli.pretty)?;
        }
        Commands::Search { query } => {
            let matches = lens.search_symbols(&query).await?;
            info!("{} matches for {:?}", matches.len(), query);
            print_json(&matches, cli.pretty)?;
        }
        Commands::Diag => {
            print_json(&lens.diagnostics(), cli.pretty)?;
        }
    }

    Ok(())
}
