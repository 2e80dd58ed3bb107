//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite checkpoint database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track scrape runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Stage-1 product cache, keyed by the listing URL and page count it came from
CREATE TABLE IF NOT EXISTS listing (
    source_url TEXT NOT NULL,
    position INTEGER NOT NULL,
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    price TEXT,
    rating_raw TEXT,
    link TEXT,
    PRIMARY KEY (source_url, position)
);

-- Enriched products, rewritten whole after every product
CREATE TABLE IF NOT EXISTS checkpoint (
    position INTEGER PRIMARY KEY,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    price TEXT,
    rating_raw TEXT,
    rating_normalized INTEGER,
    link TEXT,
    sentiment_label TEXT NOT NULL,
    sentiment_score REAL NOT NULL,
    reviews TEXT NOT NULL,
    review_dates TEXT NOT NULL,
    review_stars TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "listing", "checkpoint"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
