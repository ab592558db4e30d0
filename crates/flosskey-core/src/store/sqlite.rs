use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{StoreError, WatermarkBackend};

/// Durable watermarks in a single SQLite table, one row per account key
pub struct SqliteWatermarks {
    conn: Mutex<Connection>,
}

impl SqliteWatermarks {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS watermarks (
                account_key TEXT PRIMARY KEY NOT NULL,
                last_seen_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl WatermarkBackend for SqliteWatermarks {
    fn load(&self, account_key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT last_seen_at FROM watermarks WHERE account_key = ?1",
                params![account_key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, account_key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO watermarks (account_key, last_seen_at) VALUES (?1, ?2)
             ON CONFLICT(account_key) DO UPDATE SET last_seen_at = excluded.last_seen_at",
            params![account_key, value],
        )?;
        Ok(())
    }

    fn remove(&self, account_key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM watermarks WHERE account_key = ?1",
            params![account_key],
        )?;
        Ok(())
    }
}
