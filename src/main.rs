//! Momentum screener CLI

use clap::{Parser, Subcommand};
use momentum_screener::config::Config;
use momentum_screener::error::{AppError, Result};
use momentum_screener::fetch::{CsvImporter, DailyBarsProvider};
use momentum_screener::services::{ExportService, RefreshService};
use momentum_screener::state::AppState;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "momo")]
#[command(about = "Momentum screener for ETFs, stocks, and indices", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch fresh daily bars, recompute indicators, and rank the universe
    Refresh,

    /// Export rankings or run history to CSV
    Export {
        /// Export type: leaders, rankings, runs, symbol
        #[arg(long = "type", default_value = "leaders")]
        export_type: String,

        /// Symbol for symbol export
        #[arg(long)]
        symbol: Option<String>,

        /// Top N for leaders export
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Query date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Seed price history for a symbol from a CSV file
    Import {
        /// Ticker to store the rows under
        #[arg(long)]
        symbol: String,

        /// CSV file with Date,Open,High,Low,Close,Volume columns
        #[arg(long)]
        file: PathBuf,
    },

    /// Health check: verify configuration, store, and data freshness
    Ping,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            std::process::exit(1);
        }
    };
    momentum_screener::init_logging(&config.app.log_level, &config.app.log_format);

    let result = match cli.command {
        Commands::Refresh => run_refresh(config).await,
        Commands::Export {
            export_type,
            symbol,
            top,
            date,
        } => run_export(config, &export_type, symbol.as_deref(), top, date.as_deref()),
        Commands::Import { symbol, file } => run_import(config, &symbol, &file),
        Commands::Ping => run_ping(config),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run_refresh(config: Config) -> Result<()> {
    let state = AppState::new(config)?;

    println!("Starting data refresh...");
    let provider: Arc<dyn DailyBarsProvider> = state.provider.clone() as Arc<dyn DailyBarsProvider>;
    let summary = RefreshService::run(&state.db, &state.config, provider).await?;

    println!(
        "Refresh complete in {:.1}s (run {})",
        summary.duration.as_secs_f64(),
        summary.run_id
    );
    println!("  Success: {} symbols", summary.symbols_processed);
    println!("  Failed:  {} symbols", summary.symbols_failed);
    println!("  Ranked:  {} symbols", summary.indicators_written);

    for failure in state.db.fetch_failures(summary.run_id)? {
        println!(
            "  {}: {}",
            failure.symbol,
            failure.msg.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    if state.config.app.auto_export {
        let exporter = ExportService::new(&state.config.data.export_dir);
        let leaders = exporter.export_leaders(&state.db, state.config.app.top_n, None)?;
        println!("  Leaders:  {}", leaders.display());
        let rankings = exporter.export_rankings(&state.db, None)?;
        println!("  Rankings: {}", rankings.display());
    }

    Ok(())
}

fn run_export(
    config: Config,
    export_type: &str,
    symbol: Option<&str>,
    top: usize,
    date: Option<&str>,
) -> Result<()> {
    let state = AppState::new(config)?;
    let exporter = ExportService::new(&state.config.data.export_dir);

    let date = date
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| AppError::Parse {
                field: "date",
                value: d.to_string(),
            })
        })
        .transpose()?;

    let path = match export_type {
        "leaders" => exporter.export_leaders(&state.db, top, date)?,
        "rankings" => exporter.export_rankings(&state.db, date)?,
        "runs" => exporter.export_runs(&state.db)?,
        "symbol" => {
            let symbol = symbol.ok_or_else(|| {
                AppError::Validation(
                    "symbol required for symbol export (use --symbol)".into(),
                )
            })?;
            exporter.export_symbol_detail(&state.db, symbol)?
        }
        other => {
            return Err(AppError::Validation(format!(
                "unknown export type: {other} (valid: leaders, rankings, runs, symbol)"
            )))
        }
    };

    println!("Exported to: {}", path.display());
    Ok(())
}

fn run_import(config: Config, symbol: &str, file: &PathBuf) -> Result<()> {
    let state = AppState::new(config)?;

    state.db.ensure_universe(&[symbol.to_string()])?;
    let prices = CsvImporter::new().import_file(symbol, file)?;
    state.db.upsert_prices(&prices)?;

    println!("Imported {} rows for {}", prices.len(), symbol);
    Ok(())
}

fn run_ping(config: Config) -> Result<()> {
    println!("Performing health check...");

    let state = AppState::new(config)?;
    println!("  Config loaded successfully");

    println!("  Database: {}", state.db.path().display());
    for (key, value) in state.db.info()? {
        println!("    {key}: {value}");
    }

    let active = state.db.list_active_symbols()?;
    println!("  Active symbols: {}", active.len());

    let latest = state
        .db
        .latest_price_date_any()?
        .unwrap_or_else(|| "no data".to_string());
    println!("  Latest price data: {latest}");

    let status = state.quota.status();
    println!(
        "  Quota: {}/{} requests used",
        status.requests_used, status.daily_limit
    );

    if !state.config.data.export_dir.exists() {
        println!(
            "  Export directory does not exist yet: {}",
            state.config.data.export_dir.display()
        );
    }

    println!("Health check passed");
    Ok(())
}
