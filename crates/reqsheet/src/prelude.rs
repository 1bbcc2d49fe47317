//! Prelude module - common imports for reqsheet users
//!
//! ```rust
//! use reqsheet::prelude::*;
//! ```

pub use crate::{
    // Formatting
    CellFormat,
    Color,
    // Filters and editing
    ColumnFilters,
    EditorSession,
    // Errors
    Error,
    ExportOptions,
    // Main types
    GridModel,
    GridOptions,
    // Extension traits
    GridXlsxExt,
    HorizontalAlign,
    ImportOptions,
    MemoryClipboard,
    NumberFormat,
    Provenance,
    Result,
    SortOrder,
    VerticalAlign,
    XlsxError,
    // I/O types
    XlsxReader,
    XlsxWriter,
};
