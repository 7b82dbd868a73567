//! SQLite schema DDL and migration steps for the persistent documentation
//! cache.

use rusqlite::Connection;

use crate::errors::HoverResult;

/// Current schema version. Migrations run from whatever the DB currently
/// reports up to this value.
pub const SCHEMA_VERSION: i32 = 2;

/// Base DDL, safe to replay on an already-initialised database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS cache_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS cache_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
];

/// Bring `conn` up to [`SCHEMA_VERSION`], one savepoint per step.
pub fn migrate_schema(conn: &Connection) -> HoverResult<()> {
    let mut current_version = get_schema_version(conn);

    while current_version < SCHEMA_VERSION {
        let next_version = current_version + 1;
        conn.execute_batch("SAVEPOINT pyhover_migrate_step;")?;

        let step_result = (|| -> HoverResult<()> {
            match next_version {
                1 => migrate_to_v1(conn)?,
                2 => migrate_to_v2(conn)?,
                _ => {}
            }
            set_schema_version(conn, next_version)?;
            conn.execute_batch("RELEASE SAVEPOINT pyhover_migrate_step;")?;
            Ok(())
        })();

        if let Err(e) = step_result {
            let _ = conn.execute_batch(
                "ROLLBACK TO SAVEPOINT pyhover_migrate_step; \
                 RELEASE SAVEPOINT pyhover_migrate_step;",
            );
            return Err(e);
        }
        current_version = next_version;
    }
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> i32 {
    let result: Result<String, _> = conn.query_row(
        "SELECT value FROM cache_meta WHERE key = 'schema_version';",
        [],
        |row| row.get(0),
    );
    match result {
        Ok(v) => v.parse::<i32>().unwrap_or(0),
        Err(_) => 0,
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> HoverResult<()> {
    conn.execute(
        "INSERT INTO cache_meta(key, value) \
         VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![version.to_string()],
    )?;
    Ok(())
}

/// v0 -> v1: base tables.
fn migrate_to_v1(conn: &Connection) -> HoverResult<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    Ok(())
}

/// v1 -> v2: track payload size so callers can report cache footprint.
fn migrate_to_v2(conn: &Connection) -> HoverResult<()> {
    let has_column = conn
        .prepare("SELECT size_bytes FROM cache_entries LIMIT 0;")
        .is_ok();
    if !has_column {
        conn.execute_batch(
            "ALTER TABLE cache_entries ADD COLUMN size_bytes INTEGER NOT NULL DEFAULT 0;",
        )?;
    }
    conn.execute_batch(
        "UPDATE cache_entries SET size_bytes = length(value) WHERE size_bytes = 0;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in SCHEMA_STATEMENTS {
            conn.execute_batch(stmt).unwrap();
        }
        conn
    }

    #[test]
    fn migrate_fresh_database() {
        let conn = fresh();
        migrate_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        conn.execute(
            "INSERT INTO cache_entries(key, value, size_bytes) VALUES ('k', 'v', 1);",
            [],
        )
        .unwrap();
    }

    #[test]
    fn migrate_idempotent() {
        let conn = fresh();
        migrate_schema(&conn).unwrap();
        migrate_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_backfills_sizes_from_v1() {
        let conn = fresh();
        set_schema_version(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO cache_entries(key, value) VALUES ('k', 'hello');",
            [],
        )
        .unwrap();
        migrate_schema(&conn).unwrap();
        let size: i64 = conn
            .query_row(
                "SELECT size_bytes FROM cache_entries WHERE key = 'k';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(size, 5);
    }
}
