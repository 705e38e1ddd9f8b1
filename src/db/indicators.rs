//! Indicator persistence

use crate::db::models::{Indicator, LeaderRow, SymbolDetailRow};
use crate::error::Result;
use rusqlite::{params, Connection};

fn map_indicator(row: &rusqlite::Row<'_>) -> rusqlite::Result<Indicator> {
    Ok(Indicator {
        symbol: row.get(0)?,
        date: row.get(1)?,
        r_1m: row.get(2)?,
        r_3m: row.get(3)?,
        r_6m: row.get(4)?,
        r_12m: row.get(5)?,
        vol_3m: row.get(6)?,
        vol_6m: row.get(7)?,
        adv: row.get(8)?,
        score: row.get(9)?,
        rank: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Insert or replace a batch of indicator rows inside one transaction.
pub fn upsert_batch(conn: &mut Connection, indicators: &[Indicator]) -> Result<()> {
    if indicators.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO indicators
                 (symbol, date, r_1m, r_3m, r_6m, r_12m, vol_3m, vol_6m, adv, score, rank)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(symbol, date) DO UPDATE SET
                 r_1m = excluded.r_1m,
                 r_3m = excluded.r_3m,
                 r_6m = excluded.r_6m,
                 r_12m = excluded.r_12m,
                 vol_3m = excluded.vol_3m,
                 vol_6m = excluded.vol_6m,
                 adv = excluded.adv,
                 score = excluded.score,
                 rank = excluded.rank",
        )?;

        for ind in indicators {
            stmt.execute(params![
                ind.symbol,
                ind.date,
                ind.r_1m,
                ind.r_3m,
                ind.r_6m,
                ind.r_12m,
                ind.vol_3m,
                ind.vol_6m,
                ind.adv,
                ind.score,
                ind.rank,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Top N ranked indicator rows for a date, best rank first.
pub fn top_n(conn: &Connection, date: &str, n: i64) -> Result<Vec<Indicator>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, date, r_1m, r_3m, r_6m, r_12m, vol_3m, vol_6m, adv, score, rank, created_at
         FROM indicators
         WHERE date = ?1 AND rank IS NOT NULL
         ORDER BY rank ASC
         LIMIT ?2",
    )?;
    let indicators = stmt
        .query_map(params![date, n], map_indicator)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(indicators)
}

/// Ranked rows for a date joined with symbol metadata. A negative limit
/// returns the full ranking.
pub fn leaders(conn: &Connection, date: &str, limit: i64) -> Result<Vec<LeaderRow>> {
    let mut stmt = conn.prepare(
        "SELECT i.rank, i.symbol, s.name, s.asset_type, i.score,
                i.r_1m, i.r_3m, i.r_6m, i.r_12m, i.vol_3m, i.vol_6m, i.adv
         FROM indicators i
         JOIN symbols s ON i.symbol = s.symbol
         WHERE i.date = ?1 AND i.rank IS NOT NULL
         ORDER BY i.rank ASC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![date, limit], |row| {
            Ok(LeaderRow {
                rank: row.get(0)?,
                symbol: row.get(1)?,
                name: row.get(2)?,
                asset_type: row.get(3)?,
                score: row.get(4)?,
                r_1m: row.get(5)?,
                r_3m: row.get(6)?,
                r_6m: row.get(7)?,
                r_12m: row.get(8)?,
                vol_3m: row.get(9)?,
                vol_6m: row.get(10)?,
                adv: row.get(11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Up to `limit` most recent price rows for a symbol, left-joined with their
/// indicator rows, newest first. Feeds the symbol detail export.
pub fn symbol_detail(conn: &Connection, symbol: &str, limit: i64) -> Result<Vec<SymbolDetailRow>> {
    let mut stmt = conn.prepare(
        "SELECT p.date, p.open, p.high, p.low, p.close, p.adj_close, p.volume,
                i.r_1m, i.r_3m, i.r_6m, i.r_12m, i.vol_3m, i.vol_6m, i.adv, i.score, i.rank
         FROM prices p
         LEFT JOIN indicators i ON p.symbol = i.symbol AND p.date = i.date
         WHERE p.symbol = ?1
         ORDER BY p.date DESC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![symbol, limit], |row| {
            Ok(SymbolDetailRow {
                date: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
                adj_close: row.get(5)?,
                volume: row.get(6)?,
                r_1m: row.get(7)?,
                r_3m: row.get(8)?,
                r_6m: row.get(9)?,
                r_12m: row.get(10)?,
                vol_3m: row.get(11)?,
                vol_6m: row.get(12)?,
                adv: row.get(13)?,
                score: row.get(14)?,
                rank: row.get(15)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
