//! XLSX reader
//!
//! Reads the values of the first worksheet back into a [`GridModel`].
//! Styles are not imported.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use reqsheet_core::address::parse_a1;
use reqsheet_core::format::{number_to_cell_string, parse_number};
use reqsheet_core::GridModel;

use crate::error::{XlsxError, XlsxResult};
use crate::options::ImportOptions;

const DEFAULT_SHEET_PATH: &str = "xl/worksheets/sheet1.xml";

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode special characters in XML:
/// - `_x000d_` = CR (carriage return)
/// - `_x0007_` = BEL and other control characters
/// - `_x005f_` = Underscore (escaped underscore)
fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            result.push(c);
            continue;
        }
        if chars.peek() != Some(&'x') {
            result.push('_');
            continue;
        }
        chars.next(); // consume 'x'

        let mut hex_chars = String::new();
        while hex_chars.len() < 4 {
            match chars.peek() {
                Some(&ch) if ch.is_ascii_hexdigit() => {
                    hex_chars.push(ch);
                    chars.next();
                }
                _ => break,
            }
        }

        // Not a valid escape sequence: output what we consumed
        if hex_chars.len() < 4 || chars.peek() != Some(&'_') {
            result.push_str("_x");
            result.push_str(&hex_chars);
            continue;
        }
        chars.next(); // consume closing '_'

        match u32::from_str_radix(&hex_chars, 16)
            .ok()
            .and_then(char::from_u32)
        {
            Some(decoded) => result.push(decoded),
            None => {
                result.push_str("_x");
                result.push_str(&hex_chars);
                result.push('_');
            }
        }
    }

    result
}

/// Value of one `<c>` element while it is being read
#[derive(Default)]
struct PendingCell {
    row: usize,
    col: usize,
    cell_type: Option<String>,
    value: Option<String>,
    inline_text: Option<String>,
}

/// Cells of one worksheet, keyed by 0-based (row, column)
#[derive(Default)]
struct SheetCells {
    cells: BTreeMap<(usize, usize), String>,
    height: usize,
    width: usize,
}

impl SheetCells {
    fn extend(&mut self, row: usize, col: usize) {
        self.height = self.height.max(row + 1);
        self.width = self.width.max(col + 1);
    }
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a grid from a file path
    pub fn read_file<P: AsRef<Path>>(path: P, options: &ImportOptions) -> XlsxResult<GridModel> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file), options)
    }

    /// Read a grid from the first worksheet of an XLSX archive
    pub fn read<R: Read + Seek>(reader: R, options: &ImportOptions) -> XlsxResult<GridModel> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let sheets = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let path = sheets
            .first()
            .and_then(|(_, r_id)| sheet_paths.get(r_id))
            .cloned()
            .unwrap_or_else(|| DEFAULT_SHEET_PATH.to_string());
        if let Some((name, _)) = sheets.first() {
            log::debug!("reading worksheet '{}' from {}", name, path);
        }

        let sheet = Self::read_worksheet(&mut archive, &path, &shared_strings)?;
        Self::build_grid(sheet, options)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"t" if in_si => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        current.clear();
                        in_si = false;
                    }
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => current.push_str(&e.unescape()?),
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read workbook.xml to get sheet names and rIds, in workbook order
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let name = attr_value(&e, b"name");
                    let r_id = attr_value(&e, b"r:id");
                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read workbook.xml.rels to map worksheet rIds to part paths
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = match archive.by_name("xl/_rels/workbook.xml.rels") {
            Ok(f) => f,
            Err(_) => return Ok(HashMap::new()),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type");

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to xl/
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read the cell values of a worksheet
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        shared_strings: &[String],
    ) -> XlsxResult<SheetCells> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut sheet = SheetCells::default();
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_inline_text = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                // Style-only cells (`<c r=".." s=".."/>`) and the
                // `<dimension>` hint never size the grid; only cells with a
                // value do.
                Ok(Event::Empty(e)) if e.name().as_ref() == b"is" => {
                    if let Some(pending) = cell.as_mut() {
                        pending.inline_text.get_or_insert_with(String::new);
                    }
                }
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => {
                        let (row, col) = Self::cell_position(&e)?;
                        cell = Some(PendingCell {
                            row,
                            col,
                            cell_type: attr_value(&e, b"t"),
                            ..PendingCell::default()
                        });
                    }
                    b"v" if cell.is_some() => in_value = true,
                    b"is" => {
                        if let Some(pending) = cell.as_mut() {
                            pending.inline_text.get_or_insert_with(String::new);
                        }
                    }
                    b"t" if cell.is_some() => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_value || in_inline_text => {
                    let text = e.unescape()?;
                    if let Some(pending) = cell.as_mut() {
                        let target = if in_value {
                            &mut pending.value
                        } else {
                            &mut pending.inline_text
                        };
                        target.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"v" => in_value = false,
                    b"t" => in_inline_text = false,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            if let Some(value) = Self::cell_text(&pending, shared_strings)? {
                                sheet.extend(pending.row, pending.col);
                                sheet.cells.insert((pending.row, pending.col), value);
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheet)
    }

    fn cell_position(e: &BytesStart<'_>) -> XlsxResult<(usize, usize)> {
        let cell_ref = attr_value(e, b"r")
            .ok_or_else(|| XlsxError::Parse("cell without a reference".into()))?;
        parse_a1(&cell_ref).map_err(|e| {
            XlsxError::Parse(format!("Invalid cell reference '{}': {}", cell_ref, e))
        })
    }

    /// Text of a finished cell, or `None` for a cell without a value
    ///
    /// Formula cells read as their cached value.
    fn cell_text(cell: &PendingCell, shared_strings: &[String]) -> XlsxResult<Option<String>> {
        if cell.cell_type.as_deref() == Some("inlineStr") {
            return Ok(cell.inline_text.as_deref().map(decode_excel_escapes));
        }

        let value = match cell.value.as_deref() {
            Some(v) => v,
            None => return Ok(None),
        };

        let text = match cell.cell_type.as_deref() {
            Some("s") => {
                let idx: usize = value.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", value))
                })?;
                shared_strings
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| {
                        XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                    })?
            }
            Some("b") => {
                if value == "1" || value.eq_ignore_ascii_case("true") {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            Some("str") => decode_excel_escapes(value),
            None | Some("n") => match parse_number(value) {
                Some(n) => number_to_cell_string(n),
                None => value.to_string(),
            },
            // Errors ("e") and unknown types keep their text
            Some(_) => value.to_string(),
        };
        Ok(Some(text))
    }

    /// Turn the collected cells into a grid
    fn build_grid(sheet: SheetCells, options: &ImportOptions) -> XlsxResult<GridModel> {
        let header_rows = usize::from(options.has_header && sheet.height > 0);
        let explicit = options.column_names.as_deref().unwrap_or(&[]);
        let width = sheet.width.max(explicit.len());

        let header: Vec<Option<&str>> = (0..width)
            .map(|col| {
                explicit
                    .get(col)
                    .map(String::as_str)
                    .or_else(|| {
                        if header_rows == 1 {
                            sheet.cells.get(&(0, col)).map(String::as_str)
                        } else {
                            None
                        }
                    })
            })
            .collect();
        let data_rows = sheet.height - header_rows;
        if data_rows.saturating_mul(width) > options.max_cells {
            return Err(XlsxError::InvalidFormat(format!(
                "worksheet spans {} rows x {} columns, over the import limit of {} cells",
                data_rows, width, options.max_cells
            )));
        }
        let names = resolve_column_names(&header, &options.grid.column_prefix);

        let mut grid = GridModel::new(options.grid.clone());
        for name in &names {
            grid.add_column(name.clone())?;
        }

        for row in header_rows..sheet.height {
            let record = names.iter().enumerate().filter_map(|(col, name)| {
                sheet
                    .cells
                    .get(&(row, col))
                    .map(|value| (name.as_str(), value.clone()))
            });
            grid.push_record(record, None)?;
        }

        log::debug!(
            "imported {} rows x {} columns",
            grid.row_count(),
            grid.column_count()
        );
        Ok(grid)
    }
}

/// Unique column names from optional candidates
///
/// Blank or repeated candidates fall back to `"{prefix} N"` (N is the
/// 1-based position), skipping names already in use.
fn resolve_column_names(candidates: &[Option<&str>], prefix: &str) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut names: Vec<Option<String>> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match candidate.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) if taken.insert(name.to_string()) => names.push(Some(name.to_string())),
            _ => names.push(None),
        }
    }

    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| match name {
            Some(name) => name,
            None => {
                let mut n = idx + 1;
                let mut generated = format!("{} {}", prefix, n);
                while taken.contains(&generated) {
                    n += 1;
                    generated = format!("{} {}", prefix, n);
                }
                taken.insert(generated.clone());
                generated
            }
        })
        .collect()
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};

    fn archive(sheet_xml: &str, shared_strings: Option<&str>) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut zip = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#).unwrap();

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", options)
                .unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/></Relationships>"#).unwrap();

            if let Some(sst) = shared_strings {
                zip.start_file("xl/sharedStrings.xml", options).unwrap();
                zip.write_all(sst.as_bytes()).unwrap();
            }

            zip.start_file("xl/worksheets/data.xml", options).unwrap();
            zip.write_all(sheet_xml.as_bytes()).unwrap();

            zip.finish().unwrap();
        }
        buf
    }

    fn rows(grid: &GridModel) -> Vec<Vec<&str>> {
        (0..grid.row_count())
            .map(|r| {
                grid.columns()
                    .iter()
                    .map(|c| grid.rows()[r].get(c.id()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_decode_excel_escapes_carriage_return() {
        assert_eq!(decode_excel_escapes("hello_x000d_world"), "hello\rworld");
    }

    #[test]
    fn test_decode_excel_escapes_multiple() {
        assert_eq!(
            decode_excel_escapes("line1_x000d__x000a_line2"),
            "line1\r\nline2"
        );
    }

    #[test]
    fn test_decode_excel_escapes_underscore() {
        assert_eq!(decode_excel_escapes("_x005F_x0041_"), "_x0041_");
        assert_eq!(decode_excel_escapes("snake_case"), "snake_case");
    }

    #[test]
    fn test_decode_excel_escapes_partial_sequence() {
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("_x000d"), "_x000d");
        assert_eq!(decode_excel_escapes("a_"), "a_");
    }

    #[test]
    fn test_read_empty_sheet() {
        let bytes = archive(
            r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1"/><sheetData></sheetData></worksheet>"#,
            None,
        );
        let grid = XlsxReader::read(Cursor::new(bytes), &ImportOptions::default()).unwrap();
        assert_eq!(grid.column_count(), 0);
        assert_eq!(grid.row_count(), 0);
    }

    #[test]
    fn test_read_mixed_cell_types() {
        let sst = r#"<?xml version="1.0"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1"><si><t xml:space="preserve"> padded </t></si></sst>"#;
        let sheet = r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>12.50</v></c><c r="C1" t="b"><v>1</v></c></row><row r="3"><c r="A3" t="inlineStr"><is><t>a &amp; b</t></is></c><c r="C3"><f>SUM(B1:B2)</f><v>12.5</v></c></row></sheetData></worksheet>"#;

        let grid =
            XlsxReader::read(Cursor::new(archive(sheet, Some(sst))), &ImportOptions::default())
                .unwrap();

        assert_eq!(grid.column_names(), vec!["Column 1", "Column 2", "Column 3"]);
        assert_eq!(
            rows(&grid),
            vec![
                vec![" padded ", "12.5", "TRUE"],
                vec!["", "", ""],
                vec!["a & b", "", "12.5"],
            ]
        );
    }

    #[test]
    fn test_header_row_names_columns() {
        let sheet = r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Name</t></is></c><c r="B1" t="inlineStr"><is><t>Name</t></is></c><c r="C1" t="inlineStr"><is><t></t></is></c></row><row r="2"><c r="A2" t="inlineStr"><is><t>Ada</t></is></c></row></sheetData></worksheet>"#;

        let grid =
            XlsxReader::read(Cursor::new(archive(sheet, None)), &ImportOptions::with_header())
                .unwrap();

        assert_eq!(grid.column_names(), vec!["Name", "Column 2", "Column 3"]);
        assert_eq!(rows(&grid), vec![vec!["Ada", "", ""]]);
    }

    #[test]
    fn test_shape_comes_from_value_cells() {
        let sheet = r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:Z200000"/><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>x</t></is></c></row><row r="200000"><c r="Z200000" s="1"/></row></sheetData></worksheet>"#;

        let grid =
            XlsxReader::read(Cursor::new(archive(sheet, None)), &ImportOptions::default())
                .unwrap();

        assert_eq!(grid.column_names(), vec!["Column 1"]);
        assert_eq!(rows(&grid), vec![vec!["x"]]);
    }

    #[test]
    fn test_empty_inline_string_marks_extent() {
        let sheet = r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>x</t></is></c></row><row r="2"><c r="B2" t="inlineStr"><is><t xml:space="preserve"></t></is></c></row></sheetData></worksheet>"#;

        let grid = XlsxReader::read(
            Cursor::new(archive(sheet, None)),
            &ImportOptions::with_column_names(["Item"]),
        )
        .unwrap();

        assert_eq!(grid.column_names(), vec!["Item", "Column 2"]);
        assert_eq!(rows(&grid), vec![vec!["x", ""], vec!["", ""]]);
    }

    #[test]
    fn test_import_over_cell_limit() {
        let sheet = r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1048576"><c r="XFD1048576" t="inlineStr"><is><t>far</t></is></c></row></sheetData></worksheet>"#;

        let result = XlsxReader::read(Cursor::new(archive(sheet, None)), &ImportOptions::default());
        assert!(matches!(result, Err(XlsxError::InvalidFormat(_))));

        let options = ImportOptions {
            max_cells: 4,
            ..ImportOptions::default()
        };
        let sheet = r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="3"><c r="B3"><v>1</v></c></row></sheetData></worksheet>"#;
        let result = XlsxReader::read(Cursor::new(archive(sheet, None)), &options);
        assert!(matches!(result, Err(XlsxError::InvalidFormat(_))));
    }

    #[test]
    fn test_resolve_column_names_skips_taken() {
        let names = resolve_column_names(&[None, Some("Column 1"), Some("")], "Column");
        assert_eq!(names, vec!["Column 2", "Column 1", "Column 3"]);
    }

    #[test]
    fn test_not_an_xlsx_archive() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("readme.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hello").unwrap();
            zip.finish().unwrap();
        }
        let result = XlsxReader::read(Cursor::new(buf), &ImportOptions::default());
        assert!(matches!(result, Err(XlsxError::InvalidFormat(_))));
    }
}
