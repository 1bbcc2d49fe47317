//! Error types for reqsheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing a grid
///
/// Every grid operation that returns one of these leaves the grid exactly
/// as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A column with this name already exists
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    /// No column with this name exists
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Row index out of range
    #[error("Row index {index} out of range (row count: {len})")]
    InvalidCoordinate { index: usize, len: usize },

    /// A cell reference points at a row or column that no longer exists
    #[error("Cell reference is no longer valid")]
    StaleReference,

    /// The operation needs a selection and there is none
    #[error("No cells selected")]
    NoSelection,

    /// The platform refused clipboard access
    #[error("Clipboard access denied: {0}")]
    ClipboardAccessDenied(String),

    /// A computed number is too large to store
    #[error("Numeric result out of range in column: {0}")]
    NumericOverflow(String),

    /// Invalid column letters (e.g. "A1" or "")
    #[error("Invalid column address: {0}")]
    InvalidAddress(String),

    /// Color string that is not `#RGB`, `#RRGGBB` or `#AARRGGBB`
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

impl Error {
    pub(crate) fn invalid_row(index: usize, len: usize) -> Self {
        Error::InvalidCoordinate { index, len }
    }
}
