//! Database migrations
//!
//! Forward migrations run inside one transaction each: the up-script and the
//! version row commit together or not at all. Rollback removes exactly the
//! most recently applied migration and exists for tests.

use crate::error::{AppError, Result};
use rusqlite::{params, Connection};

struct Migration {
    version: i64,
    description: &'static str,
    up: &'static str,
    down: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema with symbols, prices, indicators, runs, and fetch_log",
    up: SCHEMA_V1,
    down: DROP_V1,
}];

/// Run all pending migrations to bring the database to the latest version.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current = current_version(conn)?;
    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        apply_migration(conn, migration)?;
    }

    Ok(())
}

/// Current schema version: max applied version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Roll back the most recently applied migration.
pub fn rollback_last(conn: &mut Connection) -> Result<()> {
    let current = current_version(conn)?;
    if current == 0 {
        return Err(AppError::Validation("no migrations to rollback".into()));
    }

    let migration = MIGRATIONS
        .iter()
        .find(|m| m.version == current)
        .ok_or_else(|| {
            AppError::Validation(format!("migration version {current} not found"))
        })?;

    let tx = conn.transaction()?;
    tx.execute_batch(migration.down)?;
    tx.execute(
        "DELETE FROM schema_migrations WHERE version = ?1",
        params![migration.version],
    )?;
    tx.commit()?;

    tracing::info!("Rolled back migration {}", migration.version);
    Ok(())
}

fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;
    Ok(())
}

fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(migration.up)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, description) VALUES (?1, ?2)",
        params![migration.version, migration.description],
    )?;
    tx.commit()?;

    tracing::info!(
        "Applied migration {}: {}",
        migration.version,
        migration.description
    );
    Ok(())
}

const SCHEMA_V1: &str = r#"
CREATE TABLE symbols (
    symbol TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    asset_type TEXT NOT NULL DEFAULT 'ETF' CHECK (asset_type IN ('ETF', 'STOCK', 'INDEX')),
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE prices (
    symbol TEXT NOT NULL REFERENCES symbols(symbol) ON DELETE CASCADE,
    date TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    adj_close REAL,
    volume INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (symbol, date)
);

CREATE TABLE indicators (
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    r_1m REAL,
    r_3m REAL,
    r_6m REAL,
    r_12m REAL,
    vol_3m REAL,
    vol_6m REAL,
    adv REAL,
    score REAL,
    rank INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (symbol, date),
    FOREIGN KEY (symbol, date) REFERENCES prices(symbol, date) ON DELETE CASCADE
);

CREATE TABLE runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    finished_at TEXT,
    status TEXT NOT NULL DEFAULT 'RUNNING' CHECK (status IN ('RUNNING', 'OK', 'ERROR')),
    symbols_processed INTEGER NOT NULL DEFAULT 0,
    symbols_failed INTEGER NOT NULL DEFAULT 0,
    notes TEXT
);

CREATE TABLE fetch_log (
    run_id INTEGER NOT NULL REFERENCES runs(run_id) ON DELETE CASCADE,
    symbol TEXT NOT NULL,
    from_dt TEXT,
    to_dt TEXT,
    rows INTEGER NOT NULL DEFAULT 0,
    ok INTEGER NOT NULL DEFAULT 0,
    msg TEXT,
    fetched_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (run_id, symbol)
);

CREATE INDEX idx_prices_symbol_date ON prices(symbol, date DESC);
CREATE INDEX idx_indicators_date_rank ON indicators(date DESC, rank);
CREATE INDEX idx_symbols_active ON symbols(active) WHERE active = 1;
CREATE INDEX idx_runs_status_date ON runs(status, started_at DESC);
CREATE INDEX idx_fetch_log_failures ON fetch_log(ok, run_id) WHERE ok = 0;
"#;

const DROP_V1: &str = r#"
DROP INDEX IF EXISTS idx_fetch_log_failures;
DROP INDEX IF EXISTS idx_runs_status_date;
DROP INDEX IF EXISTS idx_symbols_active;
DROP INDEX IF EXISTS idx_indicators_date_rank;
DROP INDEX IF EXISTS idx_prices_symbol_date;
DROP TABLE IF EXISTS fetch_log;
DROP TABLE IF EXISTS runs;
DROP TABLE IF EXISTS indicators;
DROP TABLE IF EXISTS prices;
DROP TABLE IF EXISTS symbols;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_connection;
    use tempfile::tempdir;

    fn open_test_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempdir().unwrap();
        let conn = open_connection(&dir.path().join("migrate.db")).unwrap();
        (dir, conn)
    }

    #[test]
    fn fresh_database_migrates_to_latest() {
        let (_dir, mut conn) = open_test_conn();

        run_migrations(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 1);

        // All five tables exist
        for table in ["symbols", "prices", "indicators", "runs", "fetch_log"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let (_dir, mut conn) = open_test_conn();

        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 1);
    }

    #[test]
    fn rollback_removes_last_migration() {
        let (_dir, mut conn) = open_test_conn();

        run_migrations(&mut conn).unwrap();
        rollback_last(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='symbols'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn rollback_on_empty_database_fails() {
        let (_dir, mut conn) = open_test_conn();
        init_migrations_table(&conn).unwrap();

        let err = rollback_last(&mut conn).unwrap_err();
        assert!(err.to_string().contains("no migrations to rollback"));
    }

    #[test]
    fn indexes_are_created() {
        let (_dir, mut conn) = open_test_conn();
        run_migrations(&mut conn).unwrap();

        for index in [
            "idx_prices_symbol_date",
            "idx_indicators_date_rank",
            "idx_symbols_active",
            "idx_runs_status_date",
            "idx_fetch_log_failures",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?1",
                    [index],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing index {index}");
        }
    }
}
