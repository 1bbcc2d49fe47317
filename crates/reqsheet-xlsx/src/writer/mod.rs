//! XLSX writer
//!
//! The whole archive is built in memory before anything reaches the
//! destination, so a failed export never produces a partial file.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use reqsheet_core::address::{column_to_letters, to_a1, MAX_COLUMN_INDEX};
use reqsheet_core::format::number_to_cell_string;
use reqsheet_core::{GridModel, NumberFormat};

use crate::error::{XlsxError, XlsxResult};
use crate::options::ExportOptions;
use crate::styles::{escape_xml_attr, XlsxStyleTable};

/// Maximum number of rows in a worksheet
const MAX_ROWS: usize = 1_048_576;

/// Maximum characters in one cell
const MAX_CELL_CHARS: usize = 32_767;

/// Maximum length of a sheet name
const MAX_SHEET_NAME_LEN: usize = 31;

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Encode a grid as XLSX bytes
    pub fn to_bytes(grid: &GridModel, options: &ExportOptions) -> XlsxResult<Vec<u8>> {
        Self::check_limits(grid, options)?;

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let style_table = XlsxStyleTable::build(grid, options);

        Self::write_content_types(&mut zip)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_workbook_xml(&mut zip, options)?;
        Self::write_workbook_rels(&mut zip)?;
        Self::write_styles_xml(&mut zip, &style_table)?;
        Self::write_worksheet(&mut zip, grid, options, &style_table)?;

        let cursor = zip.finish()?;
        log::debug!(
            "encoded {} rows x {} columns ({} styles)",
            grid.row_count(),
            grid.column_count(),
            style_table.style_count()
        );
        Ok(cursor.into_inner())
    }

    /// Write a grid to a writer
    ///
    /// Nothing is written unless encoding succeeds.
    pub fn write<W: Write>(grid: &GridModel, options: &ExportOptions, mut writer: W) -> XlsxResult<()> {
        let bytes = Self::to_bytes(grid, options)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a grid to a file path
    ///
    /// The file is written to a temporary file in the same directory and
    /// renamed into place, so `path` either keeps its old contents or
    /// holds the complete export.
    pub fn write_file<P: AsRef<Path>>(
        grid: &GridModel,
        options: &ExportOptions,
        path: P,
    ) -> XlsxResult<()> {
        let path = path.as_ref();
        let bytes = Self::to_bytes(grid, options)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        Ok(())
    }

    fn check_limits(grid: &GridModel, options: &ExportOptions) -> XlsxResult<()> {
        let name = &options.sheet_name;
        if name.is_empty()
            || name.chars().count() > MAX_SHEET_NAME_LEN
            || name.contains(['[', ']', ':', '*', '?', '/', '\\'])
        {
            return Err(XlsxError::Encoding(format!("invalid sheet name '{}'", name)));
        }

        let total_rows = grid.row_count() + usize::from(options.include_header);
        if total_rows > MAX_ROWS {
            return Err(XlsxError::Encoding(format!(
                "{} rows exceed the worksheet limit of {}",
                total_rows, MAX_ROWS
            )));
        }
        if grid.column_count() > MAX_COLUMN_INDEX + 1 {
            return Err(XlsxError::Encoding(format!(
                "{} columns exceed the worksheet limit of {}",
                grid.column_count(),
                MAX_COLUMN_INDEX + 1
            )));
        }

        let too_long = |s: &str| s.chars().count() > MAX_CELL_CHARS;
        if let Some(column) = grid.columns().iter().find(|c| too_long(c.name())) {
            return Err(XlsxError::Encoding(format!(
                "column name '{}...' is longer than {} characters",
                column.name().chars().take(20).collect::<String>(),
                MAX_CELL_CHARS
            )));
        }
        for (r, row) in grid.rows().iter().enumerate() {
            for (c, column) in grid.columns().iter().enumerate() {
                if too_long(row.get(column.id())) {
                    return Err(XlsxError::Encoding(format!(
                        "cell {} is longer than {} characters",
                        to_a1(r, c),
                        MAX_CELL_CHARS
                    )));
                }
            }
        }
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
    <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("_rels/.rels", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        export: &ExportOptions,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/workbook.xml", options)?;

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>
        <sheet name="{}" sheetId="1" r:id="rId1"/>
    </sheets>
</workbook>"#,
            escape_xml_attr(&export.sheet_name)
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_styles_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        style_table: &XlsxStyleTable,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/styles.xml", options)?;
        let xml = style_table.to_styles_xml();
        zip.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        grid: &GridModel,
        export: &ExportOptions,
        style_table: &XlsxStyleTable,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/worksheets/sheet1.xml", options)?;

        let header_rows = usize::from(export.include_header);
        let total_rows = grid.row_count() + header_rows;
        let dimension = if total_rows == 0 || grid.column_count() == 0 {
            "A1".to_string()
        } else {
            format!("A1:{}", to_a1(total_rows - 1, grid.column_count() - 1))
        };

        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <dimension ref="{}"/>"#,
            dimension
        );

        // Column widths from the longest displayed text
        if grid.column_count() > 0 {
            content.push_str("\n    <cols>");
            for (c, column) in grid.columns().iter().enumerate() {
                let longest = (0..grid.row_count())
                    .map(|r| {
                        let format = style_table.format(style_table.xf_at(r, c));
                        let raw = grid.rows()[r].get(column.id());
                        format
                            .number_format()
                            .display(raw, style_table.decimals(format))
                            .chars()
                            .count()
                    })
                    .max()
                    .unwrap_or(0);
                let width = export.column_width(column.name().chars().count(), longest);
                content.push_str(&format!(
                    "\n        <col min=\"{n}\" max=\"{n}\" width=\"{w}\" customWidth=\"1\"/>",
                    n = c + 1,
                    w = width
                ));
            }
            content.push_str("\n    </cols>");
        }

        content.push_str("\n    <sheetData>");

        if export.include_header && grid.column_count() > 0 {
            content.push_str("\n        <row r=\"1\">");
            for (c, column) in grid.columns().iter().enumerate() {
                content.push_str(&format!(
                    "\n            <c r=\"{}1\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                    column_to_letters(c),
                    escape_cell_text(column.name())
                ));
            }
            content.push_str("\n        </row>");
        }

        let (last_row, last_col) = (grid.row_count(), grid.column_count());
        for (r, row) in grid.rows().iter().enumerate() {
            let sheet_row = r + header_rows;
            content.push_str(&format!("\n        <row r=\"{}\">", sheet_row + 1));

            for (c, column) in grid.columns().iter().enumerate() {
                let raw = row.get(column.id());
                let xf_id = style_table.xf_at(r, c);
                let format = style_table.format(xf_id);
                let cell_ref = to_a1(sheet_row, c);
                let style_attr = if xf_id != 0 {
                    format!(" s=\"{}\"", xf_id)
                } else {
                    String::new()
                };

                match numeric_cell_value(format.number_format(), raw) {
                    Some(n) => {
                        content.push_str(&format!(
                            "\n            <c r=\"{}\"{}><v>{}</v></c>",
                            cell_ref,
                            style_attr,
                            number_to_cell_string(n)
                        ));
                    }
                    None if raw.is_empty() && r + 1 == last_row && c + 1 == last_col => {
                        // Readers size the grid from value cells, so the
                        // bottom-right cell always carries one
                        content.push_str(&format!(
                            "\n            <c r=\"{}\"{} t=\"inlineStr\"><is><t></t></is></c>",
                            cell_ref, style_attr
                        ));
                    }
                    None if raw.is_empty() => {
                        // Preserve style-only cells
                        if xf_id != 0 {
                            content.push_str(&format!(
                                "\n            <c r=\"{}\"{}/>",
                                cell_ref, style_attr
                            ));
                        }
                    }
                    None => {
                        content.push_str(&format!(
                            "\n            <c r=\"{}\"{} t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                            cell_ref,
                            style_attr,
                            escape_cell_text(raw)
                        ));
                    }
                }
            }

            content.push_str("\n        </row>");
        }

        content.push_str("\n    </sheetData>\n</worksheet>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// Number to store for `raw` under `format`, or `None` to keep it a string
///
/// Numeric formats only produce a number when it reads back as exactly the
/// stored text ("007" and "1.50" stay strings). Dates become serial numbers.
fn numeric_cell_value(format: NumberFormat, raw: &str) -> Option<f64> {
    let n = format.cell_number(raw)?;
    if format.is_numeric() && number_to_cell_string(n) != raw {
        return None;
    }
    Some(n)
}

/// Escape cell text for XML element content
///
/// Characters XML cannot carry (and CR, which XML parsers fold into LF) use
/// Excel's `_xHHHH_` escapes; a literal `_xHHHH` in the text gets its
/// underscore escaped so it reads back unchanged.
fn escape_cell_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '_' if looks_like_escape(&chars[i..]) => out.push_str("_x005F_"),
            '\t' | '\n' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {
                out.push_str(&format!("_x{:04X}_", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

// `_xHHHH` is escaped whatever follows it: the next character may itself
// be written as an escape that supplies the closing underscore.
fn looks_like_escape(chars: &[char]) -> bool {
    chars.len() >= 6
        && chars[0] == '_'
        && chars[1] == 'x'
        && chars[2..6].iter().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqsheet_core::CellFormat;
    use std::io::Read;

    fn sheet_xml(bytes: Vec<u8>) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("xl/worksheets/sheet1.xml").unwrap();
        let mut xml = String::new();
        file.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn test_escape_cell_text() {
        assert_eq!(escape_cell_text("a & <b>"), "a &amp; &lt;b&gt;");
        assert_eq!(escape_cell_text("line\r\nnext"), "line_x000D_\nnext");
        assert_eq!(escape_cell_text("bell\u{7}"), "bell_x0007_");
        assert_eq!(escape_cell_text("_x0041_"), "_x005F_x0041_");
        assert_eq!(escape_cell_text("snake_case"), "snake_case");
        assert_eq!(escape_cell_text("_x0041\r"), "_x005F_x0041_x000D_");
        assert_eq!(escape_cell_text("a_x005F\u{1}"), "a_x005F_x005F_x0001_");
        assert_eq!(escape_cell_text("_x0041"), "_x005F_x0041");
        assert_eq!(escape_cell_text("_x12"), "_x12");
    }

    #[test]
    fn test_numeric_cell_value() {
        assert_eq!(numeric_cell_value(NumberFormat::Currency, "12.5"), Some(12.5));
        assert_eq!(numeric_cell_value(NumberFormat::Currency, "12.50"), None);
        assert_eq!(numeric_cell_value(NumberFormat::Number, "007"), None);
        assert_eq!(numeric_cell_value(NumberFormat::General, "12.5"), None);
        assert_eq!(numeric_cell_value(NumberFormat::ShortDate, "2024-01-15"), Some(45306.0));
    }

    #[test]
    fn test_header_less_by_default() {
        let mut grid = GridModel::with_columns(["Name"]).unwrap();
        grid.push_record([("Name", "Ada")], None).unwrap();

        let xml = sheet_xml(XlsxWriter::to_bytes(&grid, &ExportOptions::default()).unwrap());
        assert!(xml.contains("<dimension ref=\"A1:A1\"/>"));
        assert!(xml.contains("<c r=\"A1\" t=\"inlineStr\"><is><t xml:space=\"preserve\">Ada</t></is></c>"));
        assert!(!xml.contains(">Name<"));
    }

    #[test]
    fn test_blank_last_cell_written_as_empty_string() {
        let mut grid = GridModel::with_columns(["A", "B"]).unwrap();
        grid.push_record([("A", "x")], None).unwrap();
        grid.add_row(None).unwrap();

        let xml = sheet_xml(XlsxWriter::to_bytes(&grid, &ExportOptions::default()).unwrap());
        assert!(xml.contains("<c r=\"B2\" t=\"inlineStr\"><is><t></t></is></c>"));
        assert!(!xml.contains("r=\"B1\""));
        assert!(!xml.contains("r=\"A2\""));
    }

    #[test]
    fn test_header_row_shifts_data() {
        let mut grid = GridModel::with_columns(["Name"]).unwrap();
        grid.push_record([("Name", "Ada")], None).unwrap();
        let options = ExportOptions {
            include_header: true,
            ..ExportOptions::default()
        };

        let xml = sheet_xml(XlsxWriter::to_bytes(&grid, &options).unwrap());
        assert!(xml.contains("<c r=\"A1\" t=\"inlineStr\"><is><t xml:space=\"preserve\">Name</t></is></c>"));
        assert!(xml.contains("<c r=\"A2\" t=\"inlineStr\"><is><t xml:space=\"preserve\">Ada</t></is></c>"));
    }

    #[test]
    fn test_currency_cells_written_as_numbers() {
        let mut grid = GridModel::with_columns(["Cost"]).unwrap();
        grid.push_record([("Cost", "1234.5")], None).unwrap();
        grid.push_record([("Cost", "n/a")], None).unwrap();
        grid.set_column_format(
            "Cost",
            CellFormat::new().with_number_format(NumberFormat::Currency),
        )
        .unwrap();

        let xml = sheet_xml(XlsxWriter::to_bytes(&grid, &ExportOptions::default()).unwrap());
        assert!(xml.contains("<c r=\"A1\" s=\"1\"><v>1234.5</v></c>"));
        assert!(xml.contains("<c r=\"A2\" s=\"1\" t=\"inlineStr\"><is><t xml:space=\"preserve\">n/a</t></is></c>"));
        // Width from the displayed "$1,234.50" (9 chars) + padding
        assert!(xml.contains("<col min=\"1\" max=\"1\" width=\"11\" customWidth=\"1\"/>"));
    }

    #[test]
    fn test_invalid_sheet_name_fails_before_writing() {
        let grid = GridModel::with_columns(["A"]).unwrap();
        let options = ExportOptions {
            sheet_name: "bad/name".to_string(),
            ..ExportOptions::default()
        };
        let mut out = Vec::new();
        let result = XlsxWriter::write(&grid, &options, &mut out);
        assert!(matches!(result, Err(XlsxError::Encoding(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_oversized_cell_fails() {
        let mut grid = GridModel::with_columns(["A"]).unwrap();
        grid.push_record([("A", "x".repeat(MAX_CELL_CHARS + 1))], None)
            .unwrap();
        let result = XlsxWriter::to_bytes(&grid, &ExportOptions::default());
        assert!(matches!(result, Err(XlsxError::Encoding(_))));
    }
}
