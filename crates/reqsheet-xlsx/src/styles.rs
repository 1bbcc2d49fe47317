//! XLSX styles (styles.xml) for exported grids

use std::collections::HashMap;

use reqsheet_core::{CellFormat, Color, FormatCode, GridModel};

use crate::options::ExportOptions;

const DEFAULT_FONT_NAME: &str = "Calibri";
const DEFAULT_FONT_SIZE: f64 = 11.0;

/// First ID available for custom number formats
const FIRST_CUSTOM_NUMFMT_ID: u32 = 164;

/// Deduplicated cell styles of one exported grid
///
/// `xf` 0 is the default style; every distinct effective [`CellFormat`]
/// gets its own `cellXfs` entry.
#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    formats: Vec<CellFormat>,
    /// Row-major xf id of every data cell
    cell_xfs: Vec<u32>,
    column_count: usize,
    default_decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FontKey {
    bold: bool,
    italic: bool,
    underline: bool,
    name: String,
    size_bits: u64,
    color: Option<Color>,
}

impl FontKey {
    fn default_font() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            name: DEFAULT_FONT_NAME.to_string(),
            size_bits: DEFAULT_FONT_SIZE.to_bits(),
            color: None,
        }
    }

    fn from_format(format: &CellFormat) -> Self {
        Self {
            bold: format.bold.unwrap_or(false),
            italic: format.italic.unwrap_or(false),
            underline: format.underline.unwrap_or(false),
            name: format
                .font_family
                .clone()
                .unwrap_or_else(|| DEFAULT_FONT_NAME.to_string()),
            size_bits: format.font_size.unwrap_or(DEFAULT_FONT_SIZE).to_bits(),
            color: format.text_color,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: u32,
    fill_id: u32,
    num_fmt_id: u32,
}

impl XlsxStyleTable {
    pub(crate) fn build(grid: &GridModel, options: &ExportOptions) -> Self {
        let mut formats = vec![CellFormat::default()];
        let mut format_to_xf: HashMap<CellFormat, u32> = HashMap::new();
        format_to_xf.insert(CellFormat::default(), 0);

        let column_count = grid.column_count();
        let mut cell_xfs = Vec::with_capacity(grid.row_count() * column_count);

        for row in grid.rows() {
            for column in grid.columns() {
                let key = reqsheet_core::CellKey::new(row.id(), column.id());
                let format = grid.formats().effective(key);
                let xf_id = match format_to_xf.get(&format) {
                    Some(&id) => id,
                    None => {
                        let id = formats.len() as u32;
                        formats.push(format.clone());
                        format_to_xf.insert(format, id);
                        id
                    }
                };
                cell_xfs.push(xf_id);
            }
        }

        Self {
            formats,
            cell_xfs,
            column_count,
            default_decimals: options.default_decimal_places,
        }
    }

    /// xf id of the data cell at (`row`, `col`)
    pub(crate) fn xf_at(&self, row: usize, col: usize) -> u32 {
        self.cell_xfs
            .get(row * self.column_count + col)
            .copied()
            .unwrap_or(0)
    }

    /// Format behind an xf id
    pub(crate) fn format(&self, xf_id: u32) -> &CellFormat {
        self.formats
            .get(xf_id as usize)
            .unwrap_or(&self.formats[0])
    }

    /// Decimal places used for `format`
    pub(crate) fn decimals(&self, format: &CellFormat) -> u8 {
        format.decimal_places.unwrap_or(self.default_decimals)
    }

    pub(crate) fn style_count(&self) -> usize {
        self.formats.len()
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        let mut font_ids: HashMap<FontKey, u32> = HashMap::new();
        let mut fonts: Vec<FontKey> = vec![FontKey::default_font()];
        font_ids.insert(FontKey::default_font(), 0);

        // Excel requires the first two fills to be none and gray125
        let mut fill_ids: HashMap<Color, u32> = HashMap::new();
        let mut fills: Vec<Color> = Vec::new();
        let first_solid_fill = 2;

        let mut numfmt_ids: HashMap<String, u32> = HashMap::new();
        let mut numfmts: Vec<(u32, String)> = Vec::new();
        let mut next_numfmt_id = FIRST_CUSTOM_NUMFMT_ID;

        let mut resolved = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            let font = FontKey::from_format(format);
            let font_id = match font_ids.get(&font) {
                Some(&id) => id,
                None => {
                    let id = fonts.len() as u32;
                    fonts.push(font.clone());
                    font_ids.insert(font, id);
                    id
                }
            };

            let fill_id = match format.background_color {
                None => 0,
                Some(color) => match fill_ids.get(&color) {
                    Some(&id) => id,
                    None => {
                        let id = first_solid_fill + fills.len() as u32;
                        fills.push(color);
                        fill_ids.insert(color, id);
                        id
                    }
                },
            };

            let num_fmt_id = match format.number_format {
                None => 0,
                Some(nf) => match nf.format_code(self.decimals(format)) {
                    FormatCode::BuiltIn(id) => id,
                    FormatCode::Custom(code) => match numfmt_ids.get(&code) {
                        Some(&id) => id,
                        None => {
                            let id = next_numfmt_id;
                            next_numfmt_id += 1;
                            numfmt_ids.insert(code.clone(), id);
                            numfmts.push((id, code));
                            id
                        }
                    },
                },
            };

            resolved.push(ResolvedXfIds {
                font_id,
                fill_id,
                num_fmt_id,
            });
        }

        let mut xml = String::new();
        xml.push_str(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
            for (id, code) in &numfmts {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape_xml_attr(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
        for font in &fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        xml.push_str(&format!("\n  <fills count=\"{}\">", fills.len() + 2));
        xml.push_str("\n    <fill><patternFill patternType=\"none\"/></fill>");
        xml.push_str("\n    <fill><patternFill patternType=\"gray125\"/></fill>");
        for color in &fills {
            xml.push_str(&format!(
                "\n    <fill><patternFill patternType=\"solid\"><fgColor rgb=\"{}\"/><bgColor indexed=\"64\"/></patternFill></fill>",
                color.to_argb_hex()
            ));
        }
        xml.push_str("\n  </fills>");

        xml.push_str(
            r#"
  <borders count="1">
    <border><left/><right/><top/><bottom/><diagonal/></border>
  </borders>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.formats.len()));
        for (format, ids) in self.formats.iter().zip(&resolved) {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(format, *ids));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"#,
        );
        xml
    }
}

pub(crate) fn escape_xml_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn write_font(font: &FontKey) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    if font.underline {
        s.push_str("<u/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", f64::from_bits(font.size_bits)));
    match &font.color {
        Some(color) => s.push_str(&format!("<color rgb=\"{}\"/>", color.to_argb_hex())),
        None => s.push_str("<color theme=\"1\"/>"),
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape_xml_attr(&font.name)));
    s.push_str("<family val=\"2\"/></font>");
    s
}

fn write_alignment(format: &CellFormat) -> String {
    if format.horizontal_align.is_none()
        && format.vertical_align.is_none()
        && format.wrap_text != Some(true)
    {
        return String::new();
    }

    let mut s = String::from("<alignment");
    if let Some(h) = format.horizontal_align {
        s.push_str(&format!(" horizontal=\"{}\"", h.as_str()));
    }
    if let Some(v) = format.vertical_align {
        s.push_str(&format!(" vertical=\"{}\"", v.as_str()));
    }
    if format.wrap_text == Some(true) {
        s.push_str(" wrapText=\"1\"");
    }
    s.push_str("/>");
    s
}

fn write_xf(format: &CellFormat, ids: ResolvedXfIds) -> String {
    let mut attrs = String::new();
    if ids.num_fmt_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if ids.font_id != 0 {
        attrs.push_str(" applyFont=\"1\"");
    }
    if ids.fill_id != 0 {
        attrs.push_str(" applyFill=\"1\"");
    }

    let alignment_xml = write_alignment(format);
    if !alignment_xml.is_empty() {
        attrs.push_str(" applyAlignment=\"1\"");
    }

    let mut s = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"0\" xfId=\"0\"{}",
        ids.num_fmt_id, ids.font_id, ids.fill_id, attrs
    );
    if alignment_xml.is_empty() {
        s.push_str("/>");
    } else {
        s.push('>');
        s.push_str(&alignment_xml);
        s.push_str("</xf>");
    }
    s
}
