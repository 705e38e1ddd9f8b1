//! Embedded SQLite store
//!
//! One connection guarded by a mutex serializes all writes; WAL keeps
//! concurrent readers unblocked. Repository operations live in per-entity
//! modules as free functions over `&Connection`; this wrapper delegates.

pub mod models;
mod connection;
pub mod migrations;
mod symbols;
mod prices;
mod indicators;
mod runs;
mod fetch_log;

use crate::db::models::{
    FetchLog, Indicator, LeaderRow, Price, Run, RunStatus, Symbol, SymbolDetailRow,
};
use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// SQLite store wrapper
pub struct Db {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Db {
    /// Open (or create) the store at `path`, apply pragmas, and migrate to
    /// the latest schema version.
    pub fn open(path: &Path) -> Result<Self> {
        let mut conn = connection::open_connection(path)?;
        migrations::run_migrations(&mut conn)?;

        tracing::info!("Opened database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Database settings for diagnostics.
    pub fn info(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock();
        connection::db_info(&conn)
    }

    // ========== Symbols ==========

    pub fn create_symbol(&self, symbol: &Symbol) -> Result<()> {
        let conn = self.conn.lock();
        symbols::create(&conn, symbol)
    }

    pub fn get_symbol(&self, ticker: &str) -> Result<Option<Symbol>> {
        let conn = self.conn.lock();
        symbols::get(&conn, ticker)
    }

    pub fn list_active_symbols(&self) -> Result<Vec<Symbol>> {
        let conn = self.conn.lock();
        symbols::list_active(&conn)
    }

    pub fn update_symbol(&self, symbol: &Symbol) -> Result<()> {
        let conn = self.conn.lock();
        symbols::update(&conn, symbol)
    }

    pub fn set_symbol_active(&self, ticker: &str, active: bool) -> Result<()> {
        let conn = self.conn.lock();
        symbols::set_active(&conn, ticker, active)
    }

    pub fn ensure_universe(&self, tickers: &[String]) -> Result<usize> {
        let conn = self.conn.lock();
        symbols::ensure_universe(&conn, tickers)
    }

    // ========== Prices ==========

    pub fn insert_price(&self, price: &Price) -> Result<()> {
        let conn = self.conn.lock();
        prices::insert(&conn, price)
    }

    pub fn upsert_prices(&self, batch: &[Price]) -> Result<()> {
        let mut conn = self.conn.lock();
        prices::upsert_batch(&mut conn, batch)
    }

    pub fn latest_price_date(&self, symbol: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        prices::latest_date(&conn, symbol)
    }

    pub fn latest_price_date_any(&self) -> Result<Option<String>> {
        let conn = self.conn.lock();
        prices::latest_date_any(&conn)
    }

    pub fn price_range(&self, symbol: &str, start: &str, end: &str) -> Result<Vec<Price>> {
        let conn = self.conn.lock();
        prices::get_range(&conn, symbol, start, end)
    }

    pub fn prices_for(&self, symbol: &str) -> Result<Vec<Price>> {
        let conn = self.conn.lock();
        prices::get_all(&conn, symbol)
    }

    // ========== Indicators ==========

    pub fn upsert_indicators(&self, batch: &[Indicator]) -> Result<()> {
        let mut conn = self.conn.lock();
        indicators::upsert_batch(&mut conn, batch)
    }

    pub fn top_indicators(&self, date: &str, n: i64) -> Result<Vec<Indicator>> {
        let conn = self.conn.lock();
        indicators::top_n(&conn, date, n)
    }

    pub fn leaders(&self, date: &str, limit: i64) -> Result<Vec<LeaderRow>> {
        let conn = self.conn.lock();
        indicators::leaders(&conn, date, limit)
    }

    pub fn symbol_detail(&self, symbol: &str, limit: i64) -> Result<Vec<SymbolDetailRow>> {
        let conn = self.conn.lock();
        indicators::symbol_detail(&conn, symbol, limit)
    }

    // ========== Runs ==========

    pub fn create_run(&self, notes: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock();
        runs::create(&conn, notes)
    }

    pub fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        symbols_processed: i64,
        symbols_failed: i64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        runs::finish(&conn, run_id, status, symbols_processed, symbols_failed)
    }

    pub fn latest_run(&self) -> Result<Option<Run>> {
        let conn = self.conn.lock();
        runs::latest(&conn)
    }

    pub fn list_runs(&self) -> Result<Vec<Run>> {
        let conn = self.conn.lock();
        runs::list_all(&conn)
    }

    // ========== Fetch log ==========

    pub fn log_fetch(&self, entry: &FetchLog) -> Result<()> {
        let conn = self.conn.lock();
        fetch_log::log(&conn, entry)
    }

    pub fn fetch_failures(&self, run_id: i64) -> Result<Vec<FetchLog>> {
        let conn = self.conn.lock();
        fetch_log::failures(&conn, run_id)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use tempfile::{tempdir, TempDir};

    /// Fresh migrated connection on a temp directory.
    pub fn open_test_db() -> (TempDir, Connection) {
        let dir = tempdir().unwrap();
        let mut conn = connection::open_connection(&dir.path().join("test.db")).unwrap();
        migrations::run_migrations(&mut conn).unwrap();
        (dir, conn)
    }

    /// Fresh migrated `Db` on a temp directory.
    pub fn open_test_store() -> (TempDir, Db) {
        let dir = tempdir().unwrap();
        let db = Db::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    pub fn seed_symbol(conn: &Connection, ticker: &str) {
        conn.execute(
            "INSERT INTO symbols (symbol, name, asset_type, active) VALUES (?1, ?1, 'ETF', 1)",
            [ticker],
        )
        .unwrap();
    }

    pub fn test_price(symbol: &str, date: &str, close: f64) -> Price {
        Price {
            symbol: symbol.to_string(),
            date: date.to_string(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            adj_close: Some(close),
            volume: Some(1_000_000),
            created_at: String::new(),
        }
    }

    pub fn test_indicator(symbol: &str, date: &str, rank: i64, score: f64) -> Indicator {
        Indicator {
            symbol: symbol.to_string(),
            date: date.to_string(),
            r_1m: Some(0.02),
            r_3m: Some(0.04),
            r_6m: Some(0.06),
            r_12m: Some(0.08),
            vol_3m: Some(0.15),
            vol_6m: Some(0.18),
            adv: Some(10_000_000.0),
            score: Some(score),
            rank: Some(rank),
            created_at: String::new(),
        }
    }
}
