//! Adjacency storage for molecule construction
//!
//! A full index rebuild asks for the neighbors of every entity in the graph,
//! often many times. Instead of hitting the statement store for each center,
//! the rebuild first materializes a `subject -> object` relation on disk and
//! reads neighbor lists from it.
//!
//! ## Contract
//!
//! 1. **Truncate on open**: each rebuild starts from an empty table
//! 2. **Bounded ids**: rows and columns are checked against declared capacity
//! 3. **Best-effort durability**: commit failures on close are logged, not raised
//!
//! ## Usage
//!
//! ```rust,ignore
//! use molgraph_storage::{AdjacencyStore, SqliteAdjacencyTable};
//!
//! let mut table = SqliteAdjacencyTable::open(&path, entity_count + 1, entity_count + 1, 40)?;
//! table.add(subject, object)?;
//! let neighbors = table.neighbors_of(subject)?;
//! table.close();
//! ```

pub mod domain;
pub mod error;

#[cfg(feature = "sqlite")]
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{AdjacencyStore, TableShape};

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteAdjacencyTable;
