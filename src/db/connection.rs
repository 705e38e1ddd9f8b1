//! SQLite connection utilities

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the database file and apply the standard pragmas.
///
/// Parent directories are created if missing. The connection is configured
/// for a single-writer / multi-reader workload before any user query runs.
pub fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let conn = Connection::open(path)?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    // WAL lets readers proceed while the single writer commits.
    // cache_size is in KB when negative; mmap_size is bytes.
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;
         PRAGMA temp_store=MEMORY;
         PRAGMA cache_size=-2000;
         PRAGMA mmap_size=16777216;",
    )?;
    Ok(())
}

/// Database metadata for diagnostics (used by the ping command).
pub fn db_info(conn: &Connection) -> Result<Vec<(String, String)>> {
    let queries = [
        ("journal_mode", "PRAGMA journal_mode"),
        ("synchronous", "PRAGMA synchronous"),
        ("foreign_keys", "PRAGMA foreign_keys"),
        ("page_size", "PRAGMA page_size"),
        ("page_count", "PRAGMA page_count"),
        ("schema_version", "PRAGMA schema_version"),
    ];

    let mut info = Vec::with_capacity(queries.len());
    for (key, query) in queries {
        let value: i64 = match conn.query_row(query, [], |row| row.get(0)) {
            Ok(v) => v,
            Err(_) => {
                // journal_mode reports a string, not an integer
                let s: String = conn.query_row(query, [], |row| row.get(0))?;
                info.push((key.to_string(), s));
                continue;
            }
        };
        info.push((key.to_string(), value.to_string()));
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_parent_dirs_and_applies_pragmas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/data/momentum.db");

        let conn = open_connection(&path).unwrap();
        assert!(path.exists());

        let journal: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal, "wal");

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);

        let busy: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(busy, 5000);
    }

    #[test]
    fn db_info_reports_core_settings() {
        let dir = tempdir().unwrap();
        let conn = open_connection(&dir.path().join("info.db")).unwrap();

        let info = db_info(&conn).unwrap();
        let journal = info.iter().find(|(k, _)| k == "journal_mode").unwrap();
        assert_eq!(journal.1, "wal");
        assert!(info.iter().any(|(k, _)| k == "page_size"));
    }
}
