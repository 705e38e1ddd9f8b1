//! Alpha Vantage daily-bars client
//!
//! Issues one TIME_SERIES_DAILY_ADJUSTED request per symbol, retrying
//! transient transport failures with bounded exponential backoff. In-body
//! provider errors and quota exhaustion are never retried.

use crate::db::models::Price;
use crate::error::{AppError, Result};
use crate::fetch::quota::{QuotaGate, QuotaStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Requested span of daily history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    /// Most recent ~100 trading days
    Compact,
    /// Full available history
    Full,
}

impl OutputSize {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

/// TIME_SERIES_DAILY_ADJUSTED response document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyAdjusted {
    #[serde(rename = "Meta Data", default)]
    pub meta_data: DailyMetaData,
    // BTreeMap keeps date iteration deterministic
    #[serde(rename = "Time Series (Daily)", default)]
    pub time_series: BTreeMap<String, DailyBar>,
    #[serde(rename = "Error Message", default)]
    pub error_message: String,
    #[serde(rename = "Note", default)]
    pub note: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyMetaData {
    #[serde(rename = "1. Information", default)]
    pub information: String,
    #[serde(rename = "2. Symbol", default)]
    pub symbol: String,
    #[serde(rename = "3. Last Refreshed", default)]
    pub last_refreshed: String,
    #[serde(rename = "4. Output Size", default)]
    pub output_size: String,
    #[serde(rename = "5. Time Zone", default)]
    pub time_zone: String,
}

/// One day's bar; all numeric fields arrive textually encoded
#[derive(Debug, Clone, Deserialize)]
pub struct DailyBar {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
    #[serde(rename = "5. adjusted close")]
    pub adjusted_close: String,
    #[serde(rename = "6. volume")]
    pub volume: String,
    #[serde(rename = "7. dividend amount")]
    pub dividend_amount: String,
    #[serde(rename = "8. split coefficient")]
    pub split_coefficient: String,
}

/// Source of daily-bar documents. The refresh pipeline depends on this
/// trait, not on the concrete client, so tests can substitute a stub.
#[async_trait]
pub trait DailyBarsProvider: Send + Sync {
    async fn fetch_daily_adjusted(
        &self,
        symbol: &str,
        output_size: OutputSize,
    ) -> Result<DailyAdjusted>;
}

/// Alpha Vantage API client with quota enforcement and retry
pub struct AlphaVantageClient {
    api_key: String,
    base_url: String,
    client: Client,
    quota: Arc<QuotaGate>,
    max_retries: u32,
}

impl AlphaVantageClient {
    pub fn new(
        api_key: String,
        base_url: String,
        quota: Arc<QuotaGate>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url,
            client,
            quota,
            max_retries,
        })
    }

    pub fn quota_status(&self) -> QuotaStatus {
        self.quota.status()
    }

    fn query_params<'a>(
        &'a self,
        symbol: &'a str,
        output_size: OutputSize,
    ) -> [(&'static str, &'a str); 4] {
        [
            ("function", "TIME_SERIES_DAILY_ADJUSTED"),
            ("symbol", symbol),
            ("outputsize", output_size.as_str()),
            ("apikey", self.api_key.as_str()),
        ]
    }
}

#[async_trait]
impl DailyBarsProvider for AlphaVantageClient {
    async fn fetch_daily_adjusted(
        &self,
        symbol: &str,
        output_size: OutputSize,
    ) -> Result<DailyAdjusted> {
        self.quota.check()?;

        let params = self.query_params(symbol, output_size);
        let mut recorded = false;
        let mut attempt: u32 = 0;

        let response = loop {
            let result = self
                .client
                .get(&self.base_url)
                .query(&params)
                .send()
                .await;

            // A request that was sent counts against the quota, success or not.
            if !recorded {
                self.quota.record();
                recorded = true;
            }

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        break resp;
                    }

                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if !retryable || attempt >= self.max_retries {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(AppError::HttpStatus {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    tracing::warn!(
                        "Retryable status {} fetching {} (attempt {})",
                        status,
                        symbol,
                        attempt + 1
                    );
                }
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(err.into());
                    }
                    tracing::warn!(
                        "Transport error fetching {} (attempt {}): {}",
                        symbol,
                        attempt + 1,
                        err
                    );
                }
            }

            attempt += 1;
            tokio::time::sleep(backoff_delay(attempt)).await;
        };

        let data: DailyAdjusted = response.json().await?;

        if !data.error_message.is_empty() {
            return Err(AppError::Provider {
                symbol: symbol.to_string(),
                message: data.error_message,
            });
        }
        if !data.note.is_empty() {
            return Err(AppError::ProviderThrottle {
                symbol: symbol.to_string(),
                message: data.note,
            });
        }
        if data.time_series.is_empty() {
            return Err(AppError::EmptyResponse(symbol.to_string()));
        }

        Ok(data)
    }
}

/// Exponential backoff bounded between 1 and 10 seconds.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64 << (attempt.saturating_sub(1)).min(4);
    Duration::from_secs(secs.min(10))
}

/// Lift one bar's textual fields into a typed price row.
pub fn parse_bar(symbol: &str, date: &str, bar: &DailyBar) -> Result<Price> {
    let open = parse_field("open", &bar.open)?;
    let high = parse_field("high", &bar.high)?;
    let low = parse_field("low", &bar.low)?;
    let close = parse_field("close", &bar.close)?;
    let adj_close = parse_field("adjusted close", &bar.adjusted_close)?;
    let volume: i64 = bar.volume.parse().map_err(|_| AppError::Parse {
        field: "volume",
        value: bar.volume.clone(),
    })?;
    // Dividend and split are not stored but must still parse cleanly.
    parse_field("dividend amount", &bar.dividend_amount)?;
    parse_field("split coefficient", &bar.split_coefficient)?;

    Ok(Price {
        symbol: symbol.to_string(),
        date: date.to_string(),
        open,
        high,
        low,
        close,
        adj_close: Some(adj_close),
        volume: Some(volume),
        created_at: String::new(),
    })
}

fn parse_field(field: &'static str, value: &str) -> Result<f64> {
    value.parse().map_err(|_| AppError::Parse {
        field,
        value: value.to_string(),
    })
}
