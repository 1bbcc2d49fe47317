//! # reqsheet-core
//!
//! Grid model for the reqsheet data-request portal.
//!
//! This crate provides the editable grid that recipients fill in:
//! - [`GridModel`] - Ordered rows and columns with stable identities
//! - [`CellFormat`] and [`CellFormatStore`] - Sparse per-cell formatting
//! - [`paste`] - Clipboard text parsing and grow-to-fit planning
//! - [`ColumnFilters`] - Per-column allow-list filters
//! - [`EditorSession`] - Selection, clipboard buffer and filters of one editor
//!
//! ## Example
//!
//! ```rust
//! use reqsheet_core::{CellFormat, GridModel, NumberFormat};
//!
//! let mut grid = GridModel::with_columns(["Item", "Cost"]).unwrap();
//! grid.push_record([("Item", "Paper"), ("Cost", "1234.5")], None).unwrap();
//!
//! let currency = CellFormat::new().with_number_format(NumberFormat::Currency);
//! grid.merge_format(0, "Cost", &currency).unwrap();
//!
//! // Formatting changes what is shown, never what is stored
//! assert_eq!(grid.display_value(0, "Cost").unwrap(), "$1,234.50");
//! assert_eq!(grid.get(0, "Cost").unwrap(), "1234.5");
//! ```

pub mod address;
pub mod column;
pub mod error;
pub mod filter;
pub mod format;
pub mod grid;
pub mod paste;
pub mod row;
pub mod session;

// Re-exports for convenience
pub use column::{Column, ColumnId};
pub use error::{Error, Result};
pub use filter::{search_values, ColumnFilters};
pub use grid::{compare_text, GridModel, GridOptions, PasteOutcome, SortOrder};
pub use paste::GrowthPlan;
pub use row::{Provenance, Row, RowId};
pub use session::{
    Clipboard, DeniedClipboard, EditorSession, MemoryClipboard, Selection, SelectionBounds,
};

// Re-export all format types for convenience
pub use format::{
    CellFormat, CellFormatStore, CellKey, Color, FormatCode, HorizontalAlign, NumberFormat,
    VerticalAlign, DEFAULT_DECIMAL_PLACES,
};
