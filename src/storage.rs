//! Byte storage for task attachments, keyed by stored file name.

use std::sync::Arc;

use rusqlite::OptionalExtension;
use thiserror::Error;

use crate::db::{Database, DbError};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(#[from] DbError),
}

pub trait ContentStore: Send + Sync {
    /// Stores `bytes` under `name`, replacing anything already there.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Removes `name`. Missing names are not an error.
    fn delete(&self, name: &str) -> Result<(), StorageError>;
}

/// Keeps file contents in the `file_blobs` table of the main database.
#[derive(Clone)]
pub struct SqliteContentStore {
    db: Arc<Database>,
}

impl SqliteContentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl ContentStore for SqliteContentStore {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO file_blobs (name, content, size, created_at) VALUES (?, ?, ?, ?)",
                rusqlite::params![
                    name,
                    bytes,
                    bytes.len() as i64,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })?;
        tracing::debug!("Stored {} bytes as {}", bytes.len(), name);
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let content: Option<Vec<u8>> = self.db.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT content FROM file_blobs WHERE name = ?", [name], |row| row.get(0))
                .optional()?)
        })?;
        Ok(content)
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM file_blobs WHERE name = ?", [name])?;
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteContentStore {
        SqliteContentStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn write_read_delete() {
        let store = store();
        store.write("task_1_a.txt", b"hello").unwrap();
        assert_eq!(store.read("task_1_a.txt").unwrap().as_deref(), Some(&b"hello"[..]));

        store.delete("task_1_a.txt").unwrap();
        assert_eq!(store.read("task_1_a.txt").unwrap(), None);
    }

    #[test]
    fn write_replaces_existing() {
        let store = store();
        store.write("f", b"old").unwrap();
        store.write("f", b"new").unwrap();
        assert_eq!(store.read("f").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn deleting_missing_name_is_fine() {
        assert!(store().delete("nothing").is_ok());
    }
}
