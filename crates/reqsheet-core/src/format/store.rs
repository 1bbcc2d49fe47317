//! Sparse formatting storage
//!
//! Records are keyed by `(RowId, ColumnId)`. Row ids survive insertion,
//! deletion and sorting, so formatting stays with its logical row without
//! any re-keying; only deleting a row or column drops records.

use ahash::AHashMap;

use super::CellFormat;
use crate::column::ColumnId;
use crate::row::RowId;

/// Stable address of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    /// Row identity
    pub row: RowId,
    /// Column identity
    pub column: ColumnId,
}

impl CellKey {
    /// Create a new key
    pub fn new(row: RowId, column: ColumnId) -> Self {
        Self { row, column }
    }
}

/// Per-cell and per-column formatting records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellFormatStore {
    cells: AHashMap<CellKey, CellFormat>,
    columns: AHashMap<ColumnId, CellFormat>,
}

impl CellFormatStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored record for `key`, or an empty record
    pub fn get(&self, key: CellKey) -> CellFormat {
        self.cells.get(&key).cloned().unwrap_or_default()
    }

    /// Stored record for `key`, if any
    pub fn get_ref(&self, key: CellKey) -> Option<&CellFormat> {
        self.cells.get(&key)
    }

    /// Shallow-merge `patch` into the record for `key`, creating it if absent
    ///
    /// An empty patch on a cell without a record stores nothing.
    pub fn merge(&mut self, key: CellKey, patch: &CellFormat) {
        if patch.is_empty() {
            return;
        }
        self.cells.entry(key).or_default().merge(patch);
    }

    /// Remove the record for `key` entirely
    pub fn clear(&mut self, key: CellKey) -> Option<CellFormat> {
        self.cells.remove(&key)
    }

    /// Drop every record of a deleted row, returning how many were removed
    pub fn remove_row(&mut self, row: RowId) -> usize {
        let before = self.cells.len();
        self.cells.retain(|key, _| key.row != row);
        before - self.cells.len()
    }

    /// Drop every record of a deleted column, including its column format
    pub fn remove_column(&mut self, column: ColumnId) -> usize {
        let before = self.cells.len();
        self.cells.retain(|key, _| key.column != column);
        let removed_column = self.columns.remove(&column).is_some();
        before - self.cells.len() + usize::from(removed_column)
    }

    /// Column-level record, if any
    pub fn column_format(&self, column: ColumnId) -> Option<&CellFormat> {
        self.columns.get(&column)
    }

    /// Replace the column-level record (an empty record removes it)
    pub fn set_column_format(&mut self, column: ColumnId, format: CellFormat) {
        if format.is_empty() {
            self.columns.remove(&column);
        } else {
            self.columns.insert(column, format);
        }
    }

    /// Column format overlaid with the cell format
    pub fn effective(&self, key: CellKey) -> CellFormat {
        match (self.columns.get(&key.column), self.cells.get(&key)) {
            (Some(column), Some(cell)) => cell.overlay(column),
            (Some(column), None) => column.clone(),
            (None, Some(cell)) => cell.clone(),
            (None, None) => CellFormat::default(),
        }
    }

    /// Check whether any record (cell or column level) refers to `column`
    pub fn references_column(&self, column: ColumnId) -> bool {
        self.columns.contains_key(&column) || self.cells.keys().any(|k| k.column == column)
    }

    /// Number of cell-level records
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if there are no cell or column records
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.columns.is_empty()
    }

    /// Iterate over cell-level records
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &CellFormat)> {
        self.cells.iter()
    }
}
