//! Column types

use std::fmt;

/// Stable column identity
///
/// Assigned once when the column is created and never reused within a grid,
/// so renaming a column or deleting its neighbours leaves the id untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnId(pub(crate) u64);

impl ColumnId {
    /// Raw id value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A grid column: identity plus display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    id: ColumnId,
    name: String,
}

impl Column {
    pub(crate) fn new(id: ColumnId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Column identity
    pub fn id(&self) -> ColumnId {
        self.id
    }

    /// Display name (unique within the grid)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}
