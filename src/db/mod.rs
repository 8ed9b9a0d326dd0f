pub mod models;

use parking_lot::Mutex;
use rusqlite::{params, Connection, Result};

/// Key/value store standing in for the browser's local storage.
///
/// One file can back any number of widget instances; each instance only
/// ever touches its own key.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(storage_dir: &std::path::Path) -> Result<Self> {
        std::fs::create_dir_all(storage_dir).ok();
        let db_path = storage_dir.join("chat-widget.db");
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT value FROM local_storage WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO local_storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Drops the backing table so every later read and write fails.
    #[cfg(test)]
    pub(crate) fn break_storage(&self) {
        let conn = self.conn.lock();
        conn.execute_batch("DROP TABLE local_storage;")
            .expect("drop local_storage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.get_item("k").unwrap(), None);

        db.set_item("k", "[1]").unwrap();
        db.set_item("k", "[1,2]").unwrap();
        assert_eq!(db.get_item("k").unwrap().as_deref(), Some("[1,2]"));

        db.remove_item("k").unwrap();
        assert_eq!(db.get_item("k").unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Database::new(dir.path()).unwrap();
            db.set_item("gpt-chat-history-a", "[]").unwrap();
        }
        let db = Database::new(dir.path()).unwrap();
        assert_eq!(
            db.get_item("gpt-chat-history-a").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn broken_storage_reports_errors() {
        let db = Database::in_memory().unwrap();
        db.break_storage();
        assert!(db.set_item("k", "v").is_err());
        assert!(db.get_item("k").is_err());
    }
}
