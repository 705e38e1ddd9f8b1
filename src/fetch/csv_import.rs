//! CSV bootstrap importer
//!
//! Accepts `Date,Open,High,Low,Close,Volume` exports (Stooq format) so a
//! universe can be seeded without spending API quota.

use crate::db::models::Price;
use crate::error::{AppError, Result};
use crate::fetch::validate_price;
use chrono::NaiveDate;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// OHLCV importer for headered CSV files
pub struct CsvImporter {
    has_header: bool,
}

impl CsvImporter {
    pub fn new() -> Self {
        Self { has_header: true }
    }

    pub fn without_header() -> Self {
        Self { has_header: false }
    }

    /// Import and validate all rows from a CSV file for one symbol.
    pub fn import_file(&self, symbol: &str, path: &Path) -> Result<Vec<Price>> {
        let file = File::open(path)?;
        self.import(symbol, file)
    }

    /// Import and validate all rows from a CSV reader for one symbol.
    /// Fails on the first malformed or invalid row.
    pub fn import<R: Read>(&self, symbol: &str, reader: R) -> Result<Vec<Price>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut prices = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.len() < 6 {
                return Err(AppError::Validation(format!(
                    "invalid CSV row (expected at least 6 columns, got {})",
                    record.len()
                )));
            }

            let date = NaiveDate::parse_from_str(&record[0], "%Y-%m-%d").map_err(|_| {
                AppError::Parse {
                    field: "date",
                    value: record[0].to_string(),
                }
            })?;
            let open = parse_column("open", &record[1])?;
            let high = parse_column("high", &record[2])?;
            let low = parse_column("low", &record[3])?;
            let close = parse_column("close", &record[4])?;
            let volume = parse_column("volume", &record[5])?;

            let price = Price {
                symbol: symbol.to_string(),
                date: date.format("%Y-%m-%d").to_string(),
                open,
                high,
                low,
                close,
                adj_close: Some(close),
                volume: Some(volume as i64),
                created_at: String::new(),
            };
            validate_price(&price)?;
            prices.push(price);
        }

        if prices.is_empty() {
            return Err(AppError::Validation("no records found in CSV".into()));
        }

        tracing::info!("Imported {} rows for {}", prices.len(), symbol);
        Ok(prices)
    }
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_column(field: &'static str, value: &str) -> Result<f64> {
    value.parse().map_err(|_| AppError::Parse {
        field,
        value: value.to_string(),
    })
}
