//! Fetch audit log persistence

use crate::db::models::FetchLog;
use crate::error::Result;
use rusqlite::{params, Connection};

fn map_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<FetchLog> {
    Ok(FetchLog {
        run_id: row.get(0)?,
        symbol: row.get(1)?,
        from_dt: row.get(2)?,
        to_dt: row.get(3)?,
        rows: row.get(4)?,
        ok: row.get::<_, i64>(5)? == 1,
        msg: row.get(6)?,
        fetched_at: row.get(7)?,
    })
}

/// Record one fetch outcome. A second record for the same (run_id, symbol)
/// is ignored, keeping exactly one row per attempted symbol per run.
pub fn log(conn: &Connection, entry: &FetchLog) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO fetch_log (run_id, symbol, from_dt, to_dt, rows, ok, msg)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.run_id,
            entry.symbol,
            entry.from_dt,
            entry.to_dt,
            entry.rows,
            entry.ok as i64,
            entry.msg,
        ],
    )?;
    Ok(())
}

/// Failed fetches for a run, ordered by symbol.
pub fn failures(conn: &Connection, run_id: i64) -> Result<Vec<FetchLog>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, symbol, from_dt, to_dt, rows, ok, msg, fetched_at
         FROM fetch_log
         WHERE run_id = ?1 AND ok = 0
         ORDER BY symbol",
    )?;
    let entries = stmt
        .query_map(params![run_id], map_entry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::runs;
    use crate::db::test_util::open_test_db;

    fn entry(run_id: i64, symbol: &str, ok: bool) -> FetchLog {
        FetchLog {
            run_id,
            symbol: symbol.to_string(),
            from_dt: Some("2024-01-02".to_string()),
            to_dt: Some("2024-01-31".to_string()),
            rows: if ok { 21 } else { 0 },
            ok,
            msg: if ok { None } else { Some("timeout".to_string()) },
            fetched_at: String::new(),
        }
    }

    #[test]
    fn duplicate_log_is_ignored() {
        let (_dir, conn) = open_test_db();
        let run_id = runs::create(&conn, None).unwrap();

        log(&conn, &entry(run_id, "SPY", false)).unwrap();
        log(&conn, &entry(run_id, "SPY", true)).unwrap();

        let failed = failures(&conn, run_id).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].msg.as_deref(), Some("timeout"));
    }

    #[test]
    fn failures_filters_and_orders_by_symbol() {
        let (_dir, conn) = open_test_db();
        let run_id = runs::create(&conn, None).unwrap();

        log(&conn, &entry(run_id, "SPY", true)).unwrap();
        log(&conn, &entry(run_id, "ZZZ", false)).unwrap();
        log(&conn, &entry(run_id, "AAA", false)).unwrap();

        let failed = failures(&conn, run_id).unwrap();
        let symbols: Vec<_> = failed.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "ZZZ"]);
    }

    #[test]
    fn deleting_run_cascades_to_fetch_log() {
        let (_dir, conn) = open_test_db();
        let run_id = runs::create(&conn, None).unwrap();
        log(&conn, &entry(run_id, "SPY", false)).unwrap();

        conn.execute("DELETE FROM runs WHERE run_id = ?1", [run_id])
            .unwrap();

        assert!(failures(&conn, run_id).unwrap().is_empty());
    }
}
