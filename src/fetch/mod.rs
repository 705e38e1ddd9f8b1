//! Data fetching: quota gate, provider client, scheduler, CSV import

pub mod alphavantage;
pub mod csv_import;
pub mod quota;
pub mod scheduler;

pub use alphavantage::{
    parse_bar, AlphaVantageClient, DailyAdjusted, DailyBar, DailyBarsProvider, OutputSize,
};
pub use csv_import::CsvImporter;
pub use quota::{QuotaGate, QuotaStatus};
pub use scheduler::{
    estimate_fetch_time, prioritize_fetch_order, FetchResult, FetchTask, Scheduler,
};

use crate::db::models::Price;
use crate::error::{AppError, Result};

/// Ingest validation shared by the provider path and the CSV importer.
/// The store itself does not enforce these invariants.
pub fn validate_price(price: &Price) -> Result<()> {
    if price.open < 0.0 || price.high < 0.0 || price.low < 0.0 || price.close < 0.0 {
        return Err(AppError::Validation(format!(
            "negative price for {} on {}",
            price.symbol, price.date
        )));
    }
    if price.low > price.open || price.open > price.high {
        return Err(AppError::Validation(format!(
            "open {} outside low/high range [{}, {}] for {} on {}",
            price.open, price.low, price.high, price.symbol, price.date
        )));
    }
    if price.low > price.close || price.close > price.high {
        return Err(AppError::Validation(format!(
            "close {} outside low/high range [{}, {}] for {} on {}",
            price.close, price.low, price.high, price.symbol, price.date
        )));
    }
    if let Some(volume) = price.volume {
        if volume < 0 {
            return Err(AppError::Validation(format!(
                "negative volume for {} on {}",
                price.symbol, price.date
            )));
        }
    }
    if let Some(adj_close) = price.adj_close {
        if adj_close <= 0.0 {
            return Err(AppError::Validation(format!(
                "non-positive adjusted close for {} on {}",
                price.symbol, price.date
            )));
        }
    }
    Ok(())
}
