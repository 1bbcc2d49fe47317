//! Export and import options

use reqsheet_core::{GridOptions, DEFAULT_DECIMAL_PLACES};

/// File name offered for an exported grid
pub const DEFAULT_EXPORT_FILENAME: &str = "table_data.xlsx";

/// Options for writing XLSX files
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Worksheet name (max 31 characters, no `[]:*?/\`)
    pub sheet_name: String,
    /// Write column names as the first row (default: header-less)
    pub include_header: bool,
    /// Narrowest column, in character widths
    pub min_column_width: f64,
    /// Widest column, in character widths
    pub max_column_width: f64,
    /// Added to the longest text of a column
    pub column_padding: f64,
    /// Decimal places for numeric formats that do not set their own
    pub default_decimal_places: u8,
    /// Suggested download file name
    pub filename: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            include_header: false,
            min_column_width: 10.0,
            max_column_width: 60.0,
            column_padding: 2.0,
            default_decimal_places: DEFAULT_DECIMAL_PLACES,
            filename: DEFAULT_EXPORT_FILENAME.to_string(),
        }
    }
}

impl ExportOptions {
    /// Width of a column whose header is `header_len` characters and whose
    /// longest displayed value is `text_len` characters
    pub fn column_width(&self, header_len: usize, text_len: usize) -> f64 {
        let wanted = header_len.max(text_len) as f64 + self.column_padding;
        wanted.clamp(self.min_column_width, self.max_column_width.max(self.min_column_width))
    }
}

/// Largest grid (data rows x columns) an import builds by default
pub const DEFAULT_MAX_IMPORT_CELLS: usize = 10_000_000;

/// Options for reading XLSX files into a grid
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// First row holds column names
    pub has_header: bool,
    /// Explicit column names, used before the header row
    pub column_names: Option<Vec<String>>,
    /// Options for the created grid
    pub grid: GridOptions,
    /// Sheets whose value cells span more than this many grid cells are
    /// rejected
    pub max_cells: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            has_header: false,
            column_names: None,
            grid: GridOptions::default(),
            max_cells: DEFAULT_MAX_IMPORT_CELLS,
        }
    }
}

impl ImportOptions {
    /// Read with the first row as column names
    pub fn with_header() -> Self {
        Self {
            has_header: true,
            ..Self::default()
        }
    }

    /// Read with explicit column names
    pub fn with_column_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column_names: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}
