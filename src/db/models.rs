//! Store row models

use serde::{Deserialize, Serialize};

/// Tracked instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub symbol: String,
    pub name: String,
    pub asset_type: String, // ETF, STOCK, INDEX
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// One calendar day of OHLCV for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub symbol: String,
    pub date: String, // ISO format: yyyy-mm-dd
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: Option<f64>,
    pub volume: Option<i64>,
    pub created_at: String,
}

/// Derived momentum metrics for a symbol on a date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indicator {
    pub symbol: String,
    pub date: String,
    pub r_1m: Option<f64>,
    pub r_3m: Option<f64>,
    pub r_6m: Option<f64>,
    pub r_12m: Option<f64>,
    pub vol_3m: Option<f64>,
    pub vol_6m: Option<f64>,
    pub adv: Option<f64>,
    pub score: Option<f64>,
    pub rank: Option<i64>, // 1-based, 1 = best
    pub created_at: String,
}

/// Terminal and initial states of a refresh run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Ok,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Ok => "OK",
            RunStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One refresh event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String, // RUNNING, OK, ERROR
    pub symbols_processed: i64,
    pub symbols_failed: i64,
    pub notes: Option<String>,
}

/// Per-symbol record of a fetch attempt within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLog {
    pub run_id: i64,
    pub symbol: String,
    pub from_dt: Option<String>,
    pub to_dt: Option<String>,
    pub rows: i64,
    pub ok: bool,
    pub msg: Option<String>,
    pub fetched_at: String,
}

/// Ranked indicator row joined with symbol metadata (exports, view layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderRow {
    pub rank: Option<i64>,
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    pub score: Option<f64>,
    pub r_1m: Option<f64>,
    pub r_3m: Option<f64>,
    pub r_6m: Option<f64>,
    pub r_12m: Option<f64>,
    pub vol_3m: Option<f64>,
    pub vol_6m: Option<f64>,
    pub adv: Option<f64>,
}

/// Price row left-joined with its indicator row (symbol detail export)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDetailRow {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<i64>,
    pub r_1m: Option<f64>,
    pub r_3m: Option<f64>,
    pub r_6m: Option<f64>,
    pub r_12m: Option<f64>,
    pub vol_3m: Option<f64>,
    pub vol_6m: Option<f64>,
    pub adv: Option<f64>,
    pub score: Option<f64>,
    pub rank: Option<i64>,
}
