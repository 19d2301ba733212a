//! Schema for the generation store.
//!
//! `generations` holds one row per deployed version string. `entries` holds
//! captured responses keyed by `(generation, key_hash)` and cascades away
//! with its generation, so deleting a generation row is enough to drop the
//! whole cache. `_migrations` records the highest batch applied.

use std::num::ParseIntError;

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered `(version, SQL)` batches. Append only: stores that recorded a
/// version never rerun its batch.
const MIGRATIONS: &[(&str, &str)] = &[
    ("1", include_str!("../../migrations/001_generations.sql")),
    ("2", include_str!("../../migrations/002_entries.sql")),
];

/// Bring the store up to the latest schema.
///
/// Called from [`super::CacheDb::open`] before the first generation is read.
///
/// # Errors
///
/// Returns [`Error::MigrationFailed`] for a malformed version tag, or the
/// SQLite error of the batch that failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        for (version, sql) in MIGRATIONS {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| Error::MigrationFailed(e.to_string()))?;
            if version_num > current {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version_num, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(Error::from)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        for table in ["generations", "entries"] {
            let exists: bool = conn
                .call(move |conn| {
                    conn.query_row(
                        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                        params![table],
                        |row| row.get(0),
                    )
                })
                .await
                .unwrap();
            assert!(exists, "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_deleting_generation_cascades_to_entries() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let remaining: i64 = conn
            .call(|conn| {
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     INSERT INTO generations (name, created_at) VALUES ('app-v1', '2026-01-01T00:00:00Z');
                     INSERT INTO entries (generation, key_hash, method, url, status, status_text, kind,
                                          headers_json, body, stored_at)
                     VALUES ('app-v1', 'k1', 'GET', 'https://app.example/', 200, 'OK', 'basic',
                             '[]', x'', '2026-01-01T00:00:00Z');
                     DELETE FROM generations WHERE name = 'app-v1';",
                )?;
                conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            })
            .await
            .unwrap();

        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_migrations_version_tracking() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let count: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0)))
            .await
            .unwrap();

        assert_eq!(count, MIGRATIONS.len() as i64);
    }
}
