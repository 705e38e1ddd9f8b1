//! Symbol universe persistence

use crate::db::models::Symbol;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

fn map_symbol(row: &rusqlite::Row<'_>) -> rusqlite::Result<Symbol> {
    Ok(Symbol {
        symbol: row.get(0)?,
        name: row.get(1)?,
        asset_type: row.get(2)?,
        active: row.get::<_, i64>(3)? == 1,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const SYMBOL_COLUMNS: &str = "symbol, name, asset_type, active, created_at, updated_at";

/// Insert a new symbol.
pub fn create(conn: &Connection, symbol: &Symbol) -> Result<()> {
    conn.execute(
        "INSERT INTO symbols (symbol, name, asset_type, active) VALUES (?1, ?2, ?3, ?4)",
        params![
            symbol.symbol,
            symbol.name,
            symbol.asset_type,
            symbol.active as i64
        ],
    )?;
    Ok(())
}

/// Look up a symbol by ticker.
pub fn get(conn: &Connection, ticker: &str) -> Result<Option<Symbol>> {
    let symbol = conn
        .query_row(
            &format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE symbol = ?1"),
            params![ticker],
            map_symbol,
        )
        .optional()?;
    Ok(symbol)
}

/// All active symbols, ordered by ticker.
pub fn list_active(conn: &Connection) -> Result<Vec<Symbol>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE active = 1 ORDER BY symbol"
    ))?;
    let symbols = stmt
        .query_map([], map_symbol)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(symbols)
}

/// Update name, asset type, and active flag; refreshes updated_at.
pub fn update(conn: &Connection, symbol: &Symbol) -> Result<()> {
    conn.execute(
        "UPDATE symbols
         SET name = ?1, asset_type = ?2, active = ?3, updated_at = datetime('now')
         WHERE symbol = ?4",
        params![
            symbol.name,
            symbol.asset_type,
            symbol.active as i64,
            symbol.symbol
        ],
    )?;
    Ok(())
}

/// Toggle a symbol in or out of the active universe.
pub fn set_active(conn: &Connection, ticker: &str, active: bool) -> Result<()> {
    conn.execute(
        "UPDATE symbols SET active = ?1, updated_at = datetime('now') WHERE symbol = ?2",
        params![active as i64, ticker],
    )?;
    Ok(())
}

/// Create any configured ticker not already present. Returns the number of
/// symbols created. New symbols default to ETF, named after their ticker.
pub fn ensure_universe(conn: &Connection, tickers: &[String]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO symbols (symbol, name, asset_type, active)
         VALUES (?1, ?1, 'ETF', 1)",
    )?;

    let mut created = 0;
    for ticker in tickers {
        created += stmt.execute(params![ticker])?;
    }

    if created > 0 {
        tracing::info!("Added {} new symbols to the universe", created);
    }
    Ok(created)
}
