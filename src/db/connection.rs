//! Read-only access to the local SQLite stores (Messages.db, AddressBook).
//!
//! Failures are classified into missing / unreadable / query errors. A failed
//! query never yields partial rows: either every row maps or the whole call
//! returns the error.
//!
//! CHANGELOG:
//! - 10/19/2026 - Generalized to any read-only store with failure classification
//! - 01/10/2026 - Initial stub

use rusqlite::{Connection, ErrorCode, OpenFlags, Params, Row};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const MESSAGES_STORE: &str = "Messages database";
pub const ADDRESSBOOK_STORE: &str = "AddressBook database";

/// A read-only SQLite store at a fixed path.
#[derive(Debug, Clone)]
pub struct Store {
    name: &'static str,
    path: PathBuf,
}

impl Store {
    pub fn new(name: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
        }
    }

    pub fn messages(path: impl Into<PathBuf>) -> Self {
        Self::new(MESSAGES_STORE, path)
    }

    pub fn addressbook(path: impl Into<PathBuf>) -> Self {
        Self::new(ADDRESSBOOK_STORE, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Confirm the file exists and its bytes can be read.
    pub fn check_readable(&self) -> Result<(), StoreError> {
        match std::fs::metadata(&self.path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    store: self.name,
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(self.denied(e.to_string())),
        }

        std::fs::File::open(&self.path)
            .map(|_| ())
            .map_err(|e| self.denied(e.to_string()))
    }

    /// Open a read-only connection.
    pub fn open(&self) -> Result<Connection, StoreError> {
        self.check_readable()?;
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| self.classify(e))
    }

    /// Run a parametrized query and map every row.
    pub fn query<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>, StoreError>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.open()?;
        let mut stmt = conn.prepare(sql).map_err(|e| self.classify(e))?;
        let rows = stmt.query_map(params, map).map_err(|e| self.classify(e))?;
        let collected = rows.collect::<rusqlite::Result<Vec<T>>>();
        collected.map_err(|e| self.classify(e))
    }

    /// Names of the tables present in the store.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        self.query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
            [],
            |row| row.get(0),
        )
    }

    fn denied(&self, detail: String) -> StoreError {
        StoreError::PermissionDenied {
            store: self.name,
            path: self.path.clone(),
            detail,
        }
    }

    /// Sort a SQLite failure into permission vs query problems.
    pub(crate) fn classify(&self, err: rusqlite::Error) -> StoreError {
        match err.sqlite_error_code() {
            Some(ErrorCode::CannotOpen)
            | Some(ErrorCode::PermissionDenied)
            | Some(ErrorCode::AuthorizationForStatementDenied) => self.denied(err.to_string()),
            _ => StoreError::Query {
                store: self.name,
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT);
             INSERT INTO handle (id) VALUES ('+15551234567'), ('a@b.com');",
        )
        .unwrap();
        (dir, Store::messages(path))
    }

    #[test]
    fn test_missing_store_is_distinguished() {
        let dir = TempDir::new().unwrap();
        let store = Store::messages(dir.path().join("absent.db"));
        let err = store.open().unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[test]
    fn test_query_returns_all_rows() {
        let (_dir, store) = fixture();
        let ids: Vec<String> = store
            .query("SELECT id FROM handle ORDER BY ROWID", [], |row| row.get(0))
            .unwrap();
        assert_eq!(ids, vec!["+15551234567", "a@b.com"]);
    }

    #[test]
    fn test_schema_error_is_query_error() {
        let (_dir, store) = fixture();
        let err = store
            .query("SELECT nope FROM message", [], |row| row.get::<_, i64>(0))
            .unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn test_row_mapping_failure_yields_no_partial_rows() {
        let (_dir, store) = fixture();
        // Second row cannot be read as an integer.
        let result = store.query("SELECT id FROM handle ORDER BY ROWID", [], |row| {
            let id: String = row.get(0)?;
            if id.contains('@') {
                row.get::<_, i64>(0).map(|_| id)
            } else {
                Ok(id)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_cannot_open_is_permission_denied() {
        let (_dir, store) = fixture();
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            Some("unable to open database file".into()),
        );
        assert!(store.classify(err).is_permission_denied());
    }

    #[test]
    fn test_table_names() {
        let (_dir, store) = fixture();
        assert_eq!(store.table_names().unwrap(), vec!["handle"]);
    }
}
