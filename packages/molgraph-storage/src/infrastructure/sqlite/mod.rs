//! SQLite adapter for the adjacency table
//!
//! One `WITHOUT ROWID` table keyed by `(row, col)`: duplicates collapse on
//! insert and a neighbor lookup is a single range scan of the primary key.
//! All inserts of one rebuild share a single transaction opened at `open`.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tracing::{debug, error};

use crate::domain::{AdjacencyStore, TableShape};
use crate::{Result, StorageError};

/// Initial capacity of a materialized neighbor list.
const NEIGHBOR_BUFFER: usize = 10;

const SCHEMA: &str = "CREATE TABLE adjacency (
    row INTEGER NOT NULL,
    col INTEGER NOT NULL,
    PRIMARY KEY (row, col)
) WITHOUT ROWID";

pub struct SqliteAdjacencyTable {
    conn: Connection,
    path: PathBuf,
    shape: TableShape,
    /// False when the write transaction could not be started.
    session: bool,
}

impl SqliteAdjacencyTable {
    /// Create (or truncate) the table at `path` and begin the write session.
    ///
    /// Failing to create the backing file is fatal. Failing to begin the
    /// transaction is logged and leaves the table read-only: every later
    /// `add` reports an illegal-state error.
    pub fn open(path: &Path, rows: u64, cols: u64, value_bits: u32) -> Result<Self> {
        remove_if_exists(path)?;
        remove_if_exists(&journal_path(path))?;

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.execute(SCHEMA, [])?;

        let session = match conn.execute_batch("BEGIN") {
            Ok(()) => true,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed starting adjacency transaction");
                false
            }
        };

        debug!(path = %path.display(), rows, cols, value_bits, "Opened adjacency table");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            shape: TableShape::new(rows, cols, value_bits),
            session,
        })
    }

    /// In-memory table (tests, small graphs)
    pub fn in_memory(rows: u64, cols: u64, value_bits: u32) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            shape: TableShape::new(rows, cols, value_bits),
            session: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_session(&self) -> bool {
        self.session
    }

    /// Commit the write session and release the connection.
    ///
    /// Errors are logged only; the table is rebuilt from scratch on the next
    /// full build anyway.
    pub fn close(self) {
        if self.session {
            if let Err(e) = self.conn.execute_batch("COMMIT") {
                error!(path = %self.path.display(), error = %e, "Failed committing adjacency table");
            }
        }
        if let Err((_, e)) = self.conn.close() {
            error!(path = %self.path.display(), error = %e, "Failed closing adjacency table");
        }
    }
}

impl AdjacencyStore for SqliteAdjacencyTable {
    fn add(&mut self, row: u64, col: u64) -> Result<()> {
        self.shape.check(row, col)?;
        if !self.session {
            return Err(StorageError::illegal_state("Storage not initialized"));
        }
        let mut stmt = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO adjacency (row, col) VALUES (?1, ?2)")?;
        stmt.execute(params![row as i64, col as i64])?;
        Ok(())
    }

    fn neighbors_of(&self, row: u64) -> Result<Vec<u64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT col FROM adjacency WHERE row = ?1 ORDER BY col")?;
        let mut rows = stmt.query(params![row as i64])?;

        let mut neighbors = Vec::with_capacity(NEIGHBOR_BUFFER);
        while let Some(r) = rows.next()? {
            let col: i64 = r.get(0)?;
            neighbors.push(col as u64);
        }
        Ok(neighbors)
    }

    fn shape(&self) -> TableShape {
        self.shape
    }
}

fn journal_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("-journal");
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_and_neighbors() {
        let mut table = SqliteAdjacencyTable::in_memory(100, 100, 32).unwrap();
        table.add(1, 5).unwrap();
        table.add(1, 3).unwrap();
        table.add(2, 7).unwrap();

        assert_eq!(table.neighbors_of(1).unwrap(), vec![3, 5]);
        assert_eq!(table.neighbors_of(2).unwrap(), vec![7]);
        assert!(table.neighbors_of(3).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut table = SqliteAdjacencyTable::in_memory(10, 10, 32).unwrap();
        table.add(4, 2).unwrap();
        table.add(4, 2).unwrap();
        assert_eq!(table.neighbors_of(4).unwrap(), vec![2]);
    }

    #[test]
    fn test_neighbor_list_grows_past_initial_buffer() {
        let mut table = SqliteAdjacencyTable::in_memory(1000, 1000, 32).unwrap();
        for col in 0..50 {
            table.add(7, col).unwrap();
        }
        let neighbors = table.neighbors_of(7).unwrap();
        assert_eq!(neighbors.len(), 50);
        assert_eq!(neighbors, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_add_out_of_range() {
        let mut table = SqliteAdjacencyTable::in_memory(10, 10, 32).unwrap();
        assert!(table.add(10, 1).unwrap_err().is_range());
        assert!(table.add(1, 10).unwrap_err().is_range());
    }

    #[test]
    fn test_open_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("adjacency.db");

        let mut first = SqliteAdjacencyTable::open(&path, 10, 10, 32).unwrap();
        first.add(1, 2).unwrap();
        first.close();

        let second = SqliteAdjacencyTable::open(&path, 10, 10, 32).unwrap();
        assert!(second.has_session());
        assert!(second.neighbors_of(1).unwrap().is_empty());
        second.close();
    }

    #[test]
    fn test_close_commits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("adjacency.db");

        let mut table = SqliteAdjacencyTable::open(&path, 10, 10, 32).unwrap();
        table.add(3, 4).unwrap();
        table.close();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM adjacency WHERE row = 3", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_open_fails_when_parent_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("adjacency.db");
        assert!(SqliteAdjacencyTable::open(&path, 10, 10, 32).is_err());
    }

    #[test]
    fn test_add_without_session_is_illegal_state() {
        let mut table = SqliteAdjacencyTable::in_memory(10, 10, 32).unwrap();
        table.conn.execute_batch("COMMIT").unwrap();
        table.session = false;

        let err = table.add(1, 2).unwrap_err();
        assert!(err.is_illegal_state());
    }
}
