//! Application error types

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error(
        "daily API quota exceeded ({used}/{limit} requests used). Quota resets in {hours}h{minutes}m. \
         Consider: (1) waiting for reset, (2) using CSV import for historical data, \
         or (3) upgrading to a paid API plan"
    )]
    QuotaExceeded {
        used: u32,
        limit: u32,
        hours: i64,
        minutes: i64,
    },

    #[error("API error for {symbol}: {message}")]
    Provider { symbol: String, message: String },

    #[error("API rate limit note for {symbol}: {message}")]
    ProviderThrottle { symbol: String, message: String },

    #[error("no data returned for {0}")]
    EmptyResponse(String),

    #[error("failed to parse {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("insufficient data: need {need} bars, have {have}")]
    InsufficientHistory { need: usize, have: usize },

    #[error("zero price encountered, cannot calculate log return")]
    ZeroPrice,

    #[error("no symbols passed filtering criteria")]
    NoSurvivors,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("fetch cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AppError {
    /// Whether a price insert failed because the (symbol, date) row already
    /// exists. Callers may treat this as a no-op.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            AppError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
