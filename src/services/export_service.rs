//! CSV export
//!
//! Writes leaders, full rankings, run history, and per-symbol detail
//! files. File names carry the emission date, not the query date.

use crate::db::Db;
use crate::error::Result;
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

const RANKING_HEADER: [&str; 12] = [
    "Rank", "Symbol", "Name", "Asset Type", "Score", "R1M", "R3M", "R6M", "R12M", "Vol3M",
    "Vol6M", "ADV",
];

/// CSV exporter rooted at a configured directory
pub struct ExportService {
    export_dir: PathBuf,
}

impl ExportService {
    pub fn new(export_dir: &Path) -> Self {
        Self {
            export_dir: export_dir.to_path_buf(),
        }
    }

    /// Export the top N leaders for a date (default today) to
    /// `leaders-YYYYMMDD.csv`.
    pub fn export_leaders(
        &self,
        db: &Db,
        top_n: usize,
        date: Option<NaiveDate>,
    ) -> Result<PathBuf> {
        self.write_ranking_file(db, "leaders", top_n as i64, date)
    }

    /// Export the full ranking for a date (default today) to
    /// `rankings-YYYYMMDD.csv`.
    pub fn export_rankings(&self, db: &Db, date: Option<NaiveDate>) -> Result<PathBuf> {
        self.write_ranking_file(db, "rankings", -1, date)
    }

    fn write_ranking_file(
        &self,
        db: &Db,
        prefix: &str,
        limit: i64,
        date: Option<NaiveDate>,
    ) -> Result<PathBuf> {
        let query_date = date
            .unwrap_or_else(|| Local::now().date_naive())
            .format("%Y-%m-%d")
            .to_string();
        let rows = db.leaders(&query_date, limit)?;

        let path = self.stamped_path(prefix);
        std::fs::create_dir_all(&self.export_dir)?;
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(RANKING_HEADER)?;

        for row in &rows {
            writer.write_record([
                format_int(row.rank),
                row.symbol.clone(),
                row.name.clone(),
                row.asset_type.clone(),
                format_float(row.score, 3),
                format_percent(row.r_1m),
                format_percent(row.r_3m),
                format_percent(row.r_6m),
                format_percent(row.r_12m),
                format_percent(row.vol_3m),
                format_percent(row.vol_6m),
                format_float(row.adv, 0),
            ])?;
        }
        writer.flush()?;

        tracing::info!("Exported {} rows to {}", rows.len(), path.display());
        Ok(path)
    }

    /// Export the run ledger to `runs-YYYYMMDD.csv`, newest first.
    pub fn export_runs(&self, db: &Db) -> Result<PathBuf> {
        let runs = db.list_runs()?;

        let path = self.stamped_path("runs");
        std::fs::create_dir_all(&self.export_dir)?;
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record([
            "RunID",
            "StartedAt",
            "FinishedAt",
            "Status",
            "SymbolsProcessed",
            "SymbolsFailed",
            "Notes",
        ])?;

        for run in &runs {
            writer.write_record([
                run.run_id.to_string(),
                run.started_at.clone(),
                run.finished_at.clone().unwrap_or_default(),
                run.status.clone(),
                run.symbols_processed.to_string(),
                run.symbols_failed.to_string(),
                run.notes.clone().unwrap_or_default(),
            ])?;
        }
        writer.flush()?;

        Ok(path)
    }

    /// Export up to a year of price and indicator history for one symbol
    /// to `symbol-<SYMBOL>-YYYYMMDD.csv`, newest first.
    pub fn export_symbol_detail(&self, db: &Db, symbol: &str) -> Result<PathBuf> {
        let rows = db.symbol_detail(symbol, 365)?;

        let path = self.stamped_path(&format!("symbol-{symbol}"));
        std::fs::create_dir_all(&self.export_dir)?;
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record([
            "Date", "Open", "High", "Low", "Close", "AdjClose", "Volume", "R1M", "R3M", "R6M",
            "R12M", "Vol3M", "Vol6M", "ADV", "Score", "Rank",
        ])?;

        for row in &rows {
            writer.write_record([
                row.date.clone(),
                format_float(row.open, 2),
                format_float(row.high, 2),
                format_float(row.low, 2),
                format_float(row.close, 2),
                format_float(row.adj_close, 2),
                format_int(row.volume),
                format_percent(row.r_1m),
                format_percent(row.r_3m),
                format_percent(row.r_6m),
                format_percent(row.r_12m),
                format_percent(row.vol_3m),
                format_percent(row.vol_6m),
                format_float(row.adv, 0),
                format_float(row.score, 3),
                format_int(row.rank),
            ])?;
        }
        writer.flush()?;

        Ok(path)
    }

    fn stamped_path(&self, prefix: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d");
        self.export_dir.join(format!("{prefix}-{stamp}.csv"))
    }
}

fn format_float(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => String::new(),
    }
}

fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => String::new(),
    }
}

fn format_int(value: Option<i64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}
