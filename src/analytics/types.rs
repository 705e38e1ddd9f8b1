//! Analytics value types

use crate::db::models::{Indicator, Price};
use crate::error::{AppError, Result};
use chrono::NaiveDate;

/// One trading day of prices, ready for calculation. `adj_close` falls back
/// to the raw close when the stored value is missing; a missing volume
/// contributes zero dollar volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl TryFrom<&Price> for PriceBar {
    type Error = AppError;

    fn try_from(price: &Price) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&price.date, "%Y-%m-%d").map_err(|_| {
            AppError::Parse {
                field: "date",
                value: price.date.clone(),
            }
        })?;
        Ok(PriceBar {
            date,
            open: price.open,
            high: price.high,
            low: price.low,
            close: price.close,
            adj_close: price.adj_close.unwrap_or(price.close),
            volume: price.volume.unwrap_or(0) as f64,
        })
    }
}

/// Calculated momentum metrics for one symbol at the latest date of its
/// series. Score and rank are zero until the scorer fills them in.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub symbol: String,
    pub date: NaiveDate,
    pub r_1m: f64,
    pub r_3m: f64,
    pub r_6m: f64,
    pub r_12m: f64,
    pub vol_3m: f64,
    pub vol_6m: f64,
    pub adv: f64,
    pub score: f64,
    pub rank: i64,
}

impl IndicatorSet {
    /// Convert to a store row.
    pub fn to_row(&self) -> Indicator {
        Indicator {
            symbol: self.symbol.clone(),
            date: self.date.format("%Y-%m-%d").to_string(),
            r_1m: Some(self.r_1m),
            r_3m: Some(self.r_3m),
            r_6m: Some(self.r_6m),
            r_12m: Some(self.r_12m),
            vol_3m: Some(self.vol_3m),
            vol_6m: Some(self.vol_6m),
            adv: Some(self.adv),
            score: Some(self.score),
            rank: Some(self.rank),
            created_at: String::new(),
        }
    }
}
