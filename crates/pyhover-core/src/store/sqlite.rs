//! SQLite-backed [`DocCache`] for caches that should survive editor restarts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::errors::HoverResult;
use crate::store::cache::DocCache;
use crate::store::schema;

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if raw == "~" || raw.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if raw.len() > 2 {
                expanded.push(&raw[2..]);
            }
            return expanded;
        }
    }
    path.to_path_buf()
}

pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

fn get_value(conn: &Connection, key: &str) -> HoverResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM cache_entries WHERE key = ?1;",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn set_value(conn: &Connection, key: &str, value: &str) -> HoverResult<()> {
    conn.execute(
        "INSERT INTO cache_entries(key, value, size_bytes, updated_at) \
         VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
         size_bytes = excluded.size_bytes, updated_at = excluded.updated_at;",
        params![key, value, value.len() as i64],
    )?;
    Ok(())
}

fn clear_values(conn: &Connection) -> HoverResult<()> {
    conn.execute("DELETE FROM cache_entries;", [])?;
    Ok(())
}

impl SqliteCache {
    /// Open (creating parent directories as needed) and migrate.
    pub fn open(path: impl AsRef<Path>) -> HoverResult<Self> {
        let resolved = expand_tilde(path.as_ref());
        if let Some(parent) = resolved.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&resolved)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> HoverResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> HoverResult<Self> {
        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)?;
        }
        schema::migrate_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a statement on the blocking pool so async callers never stall a
    /// runtime worker on disk I/O or the connection lock.
    async fn with_conn<T, F>(&self, op: F) -> HoverResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> HoverResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || op(&*conn.lock())).await?
    }

    /// `(entry count, total payload bytes)`.
    pub fn stats(&self) -> HoverResult<(i64, i64)> {
        let conn = self.conn.lock();
        let stats = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) FROM cache_entries;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(stats)
    }
}

#[async_trait]
impl DocCache for SqliteCache {
    async fn get(&self, key: &str) -> Option<String> {
        let owned = key.to_string();
        match self.with_conn(move |conn| get_value(conn, &owned)).await {
            Ok(v) => v,
            Err(e) => {
                warn!("sqlite cache read failed for {key}: {e}");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String) {
        let owned = key.to_string();
        if let Err(e) = self.with_conn(move |conn| set_value(conn, &owned, &value)).await {
            warn!("sqlite cache write failed for {key}: {e}");
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.with_conn(clear_values).await {
            warn!("sqlite cache clear failed: {e}");
        }
    }
}
