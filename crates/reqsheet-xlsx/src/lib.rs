//! # reqsheet-xlsx
//!
//! XLSX (Office Open XML) export and import for reqsheet grids.
//!
//! The exported workbook has a single worksheet. Each cell carries the
//! style and number format of its effective [`CellFormat`], while the
//! stored value is written untransformed, so formatting never leaks back
//! into the data on re-import.
//!
//! [`CellFormat`]: reqsheet_core::CellFormat

pub mod error;
pub mod options;
pub mod reader;
pub mod writer;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use options::{ExportOptions, ImportOptions, DEFAULT_EXPORT_FILENAME, DEFAULT_MAX_IMPORT_CELLS};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
