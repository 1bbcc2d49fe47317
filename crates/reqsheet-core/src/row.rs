//! Row types

use std::fmt;

use ahash::AHashMap;

use crate::column::ColumnId;

/// Stable row identity
///
/// Sparse per-cell state (formats, selection) is keyed by this id instead of
/// the row's position, so inserting, deleting or sorting rows never needs to
/// re-key anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowId(pub(crate) u64);

impl RowId {
    /// Raw id value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Where a row came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "camelCase"))]
pub enum Provenance {
    /// Seeded from the request's initial template rows
    Template,
    /// Contributed by a department's submission
    Submission {
        /// Submitting department
        department: String,
    },
}

impl Provenance {
    /// Submission provenance for `department`
    pub fn submission(department: impl Into<String>) -> Self {
        Provenance::Submission {
            department: department.into(),
        }
    }
}

/// A grid row: stable id, values keyed by column id, optional provenance
///
/// A column with no stored value reads as the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    id: RowId,
    cells: AHashMap<ColumnId, String>,
    provenance: Option<Provenance>,
}

impl Row {
    pub(crate) fn new(id: RowId) -> Self {
        Self {
            id,
            cells: AHashMap::new(),
            provenance: None,
        }
    }

    /// Row identity
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Value stored for `column` ("" when absent)
    pub fn get(&self, column: ColumnId) -> &str {
        self.cells.get(&column).map(String::as_str).unwrap_or("")
    }

    /// Check whether a value is stored for `column`
    pub fn contains(&self, column: ColumnId) -> bool {
        self.cells.contains_key(&column)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no values are stored
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Origin of this row, if known
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    pub(crate) fn set(&mut self, column: ColumnId, value: impl Into<String>) {
        self.cells.insert(column, value.into());
    }

    pub(crate) fn remove(&mut self, column: ColumnId) -> Option<String> {
        self.cells.remove(&column)
    }

    pub(crate) fn set_provenance(&mut self, provenance: Option<Provenance>) {
        self.provenance = provenance;
    }

    pub(crate) fn get_mut(&mut self, column: ColumnId) -> Option<&mut String> {
        self.cells.get_mut(&column)
    }
}
