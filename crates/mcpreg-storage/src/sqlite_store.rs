//! SQLite implementation of `Store`.
//!
//! One `kv_store` row per key. The registry keeps its whole list under
//! `mcp_servers`; the encrypted vault keeps one row per provider token.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mcpreg_core::Store;
use rusqlite::params;
use tokio::sync::Mutex;

use crate::Database;

pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Remove a key. Removing an absent key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
        Ok(())
    }

    /// All keys, sorted
    pub async fn keys(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let mut stmt = db
            .connection()
            .prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;

        let result = db.connection().query_row(
            "SELECT value FROM kv_store WHERE key = ?",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;

        db.connection().execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?, ?, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;

        Ok(())
    }
}
