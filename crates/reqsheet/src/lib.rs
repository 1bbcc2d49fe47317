//! # reqsheet
//!
//! Editable grids for data requests: an operator publishes a request with
//! a tabular template, departments fill in rows, and the result is
//! exported as an XLSX workbook.
//!
//! ## Features
//!
//! - Grid model with stable row and column identities
//! - Sparse per-cell and per-column formatting with number formats
//! - Clipboard paste that grows the grid to fit
//! - Per-column allow-list filters
//! - XLSX export (and import, for checking an export)
//! - Request documents with in-memory or Postgres persistence (feature `store`)
//!
//! ## Example
//!
//! ```rust
//! use reqsheet::prelude::*;
//!
//! let mut grid = GridModel::with_columns(["Item", "Cost"]).unwrap();
//! grid.add_row(None).unwrap();
//! grid.apply_paste(0, "Item", "Paper\t12.5\nToner\t80").unwrap();
//! grid.set_column_format("Cost", CellFormat::new().with_number_format(NumberFormat::Currency))
//!     .unwrap();
//!
//! assert_eq!(grid.display_value(1, "Cost").unwrap(), "$80.00");
//!
//! let bytes = grid.to_xlsx(&ExportOptions::default()).unwrap();
//! let back = GridModel::from_xlsx(&bytes, &ImportOptions::with_column_names(["Item", "Cost"]))
//!     .unwrap();
//! assert_eq!(back.get(1, "Cost").unwrap(), "80");
//! ```

pub mod prelude;

// Re-export core types
pub use reqsheet_core::{
    address, compare_text, paste, search_values, CellFormat, CellFormatStore, CellKey, Clipboard,
    Color, Column, ColumnFilters, ColumnId, DeniedClipboard, EditorSession, Error, FormatCode,
    GridModel, GridOptions, GrowthPlan, HorizontalAlign, MemoryClipboard, NumberFormat,
    PasteOutcome, Provenance, Result, Row, RowId, Selection, SelectionBounds, SortOrder,
    VerticalAlign, DEFAULT_DECIMAL_PLACES,
};

// Re-export I/O types
pub use reqsheet_xlsx::{
    ExportOptions, ImportOptions, XlsxError, XlsxReader, XlsxResult, XlsxWriter,
    DEFAULT_EXPORT_FILENAME,
};

#[cfg(feature = "store")]
pub use reqsheet_store as store;

use std::io::Cursor;
use std::path::Path;

/// Extension trait for GridModel to add XLSX file I/O
pub trait GridXlsxExt: Sized {
    /// Encode as XLSX bytes
    fn to_xlsx(&self, options: &ExportOptions) -> XlsxResult<Vec<u8>>;

    /// Decode from XLSX bytes
    fn from_xlsx(bytes: &[u8], options: &ImportOptions) -> XlsxResult<Self>;

    /// Open a grid from a file
    fn open<P: AsRef<Path>>(path: P, options: &ImportOptions) -> XlsxResult<Self>;

    /// Save the grid to a file
    fn save<P: AsRef<Path>>(&self, path: P, options: &ExportOptions) -> XlsxResult<()>;
}

impl GridXlsxExt for GridModel {
    fn to_xlsx(&self, options: &ExportOptions) -> XlsxResult<Vec<u8>> {
        XlsxWriter::to_bytes(self, options)
    }

    fn from_xlsx(bytes: &[u8], options: &ImportOptions) -> XlsxResult<Self> {
        XlsxReader::read(Cursor::new(bytes), options)
    }

    fn open<P: AsRef<Path>>(path: P, options: &ImportOptions) -> XlsxResult<Self> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xlsx") | Some("xlsm") => XlsxReader::read_file(path, options),
            _ => Err(XlsxError::InvalidFormat(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P, options: &ExportOptions) -> XlsxResult<()> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xlsx") => XlsxWriter::write_file(self, options, path),
            _ => Err(XlsxError::InvalidFormat(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
