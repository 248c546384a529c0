//! Domain layer for the adjacency table
//!
//! # Port Trait
//!
//! - `AdjacencyStore`: directed `row -> col` relation with materialized neighbor lists

use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Declared dimensions of an adjacency table.
///
/// Rows and columns are entity ids; `value_bits` is the width reserved for a
/// column value, so a column must also fit in that many bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableShape {
    pub rows: u64,
    pub cols: u64,
    pub value_bits: u32,
}

impl TableShape {
    pub fn new(rows: u64, cols: u64, value_bits: u32) -> Self {
        Self {
            rows,
            cols,
            value_bits,
        }
    }

    /// Reject an edge that falls outside the declared shape.
    pub fn check(&self, row: u64, col: u64) -> Result<()> {
        if row >= self.rows {
            return Err(StorageError::range("row", row, self.rows));
        }
        if col >= self.cols {
            return Err(StorageError::range("col", col, self.cols));
        }
        if self.value_bits < 64 && col >> self.value_bits != 0 {
            return Err(StorageError::range(
                "col",
                col,
                (1u64 << self.value_bits) - 1,
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Directed adjacency relation used during a full rebuild.
///
/// `neighbors_of` returns a fully materialized list, never a lazy cursor,
/// so callers may keep it across later `add` calls.
pub trait AdjacencyStore {
    /// Record the edge `row -> col`. Duplicate edges are stored once.
    fn add(&mut self, row: u64, col: u64) -> Result<()>;

    /// All columns recorded for `row`, ascending.
    fn neighbors_of(&self, row: u64) -> Result<Vec<u64>>;

    fn shape(&self) -> TableShape;
}
