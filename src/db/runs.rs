//! Run ledger persistence

use crate::db::models::{Run, RunStatus};
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

fn map_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<Run> {
    Ok(Run {
        run_id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        status: row.get(3)?,
        symbols_processed: row.get(4)?,
        symbols_failed: row.get(5)?,
        notes: row.get(6)?,
    })
}

const RUN_COLUMNS: &str =
    "run_id, started_at, finished_at, status, symbols_processed, symbols_failed, notes";

/// Open a new run with status RUNNING; returns its run_id.
pub fn create(conn: &Connection, notes: Option<&str>) -> Result<i64> {
    conn.execute(
        "INSERT INTO runs (status, notes) VALUES ('RUNNING', ?1)",
        params![notes],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Close a run with a terminal status and final counts.
pub fn finish(
    conn: &Connection,
    run_id: i64,
    status: RunStatus,
    symbols_processed: i64,
    symbols_failed: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE runs
         SET finished_at = datetime('now'),
             status = ?1,
             symbols_processed = ?2,
             symbols_failed = ?3
         WHERE run_id = ?4",
        params![status.as_str(), symbols_processed, symbols_failed, run_id],
    )?;
    Ok(())
}

/// Most recent run by run_id, if any.
pub fn latest(conn: &Connection) -> Result<Option<Run>> {
    let run = conn
        .query_row(
            &format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY run_id DESC LIMIT 1"),
            [],
            map_run,
        )
        .optional()?;
    Ok(run)
}

/// Full run history, newest first.
pub fn list_all(conn: &Connection) -> Result<Vec<Run>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RUN_COLUMNS} FROM runs ORDER BY run_id DESC"
    ))?;
    let runs = stmt
        .query_map([], map_run)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(runs)
}
