//! Daily price persistence

use crate::db::models::Price;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

fn map_price(row: &rusqlite::Row<'_>) -> rusqlite::Result<Price> {
    Ok(Price {
        symbol: row.get(0)?,
        date: row.get(1)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        adj_close: row.get(6)?,
        volume: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const PRICE_COLUMNS: &str =
    "symbol, date, open, high, low, close, adj_close, volume, created_at";

/// Insert a single price row. A duplicate (symbol, date) surfaces as a
/// constraint violation the caller may treat as "already exists".
pub fn insert(conn: &Connection, price: &Price) -> Result<()> {
    conn.execute(
        "INSERT INTO prices (symbol, date, open, high, low, close, adj_close, volume)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            price.symbol,
            price.date,
            price.open,
            price.high,
            price.low,
            price.close,
            price.adj_close,
            price.volume,
        ],
    )?;
    Ok(())
}

/// Insert or replace a batch of price rows inside one transaction.
pub fn upsert_batch(conn: &mut Connection, prices: &[Price]) -> Result<()> {
    if prices.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO prices (symbol, date, open, high, low, close, adj_close, volume)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(symbol, date) DO UPDATE SET
                 open = excluded.open,
                 high = excluded.high,
                 low = excluded.low,
                 close = excluded.close,
                 adj_close = excluded.adj_close,
                 volume = excluded.volume",
        )?;

        for price in prices {
            stmt.execute(params![
                price.symbol,
                price.date,
                price.open,
                price.high,
                price.low,
                price.close,
                price.adj_close,
                price.volume,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Most recent date with price data for a symbol, if any.
pub fn latest_date(conn: &Connection, symbol: &str) -> Result<Option<String>> {
    let date: Option<String> = conn
        .query_row(
            "SELECT MAX(date) FROM prices WHERE symbol = ?1",
            params![symbol],
            |row| row.get(0),
        )
        .optional()?
        .flatten();
    Ok(date)
}

/// Most recent date with price data across all symbols, if any.
pub fn latest_date_any(conn: &Connection) -> Result<Option<String>> {
    let date: Option<String> = conn
        .query_row("SELECT MAX(date) FROM prices", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(date)
}

/// Price rows for a symbol within an inclusive date range, ascending.
pub fn get_range(
    conn: &Connection,
    symbol: &str,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<Price>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRICE_COLUMNS} FROM prices
         WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
         ORDER BY date ASC"
    ))?;
    let prices = stmt
        .query_map(params![symbol, start_date, end_date], map_price)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(prices)
}

/// Full price series for a symbol, ascending by date.
pub fn get_all(conn: &Connection, symbol: &str) -> Result<Vec<Price>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRICE_COLUMNS} FROM prices WHERE symbol = ?1 ORDER BY date ASC"
    ))?;
    let prices = stmt
        .query_map(params![symbol], map_price)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(prices)
}
