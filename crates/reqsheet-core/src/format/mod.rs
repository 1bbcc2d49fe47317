//! Cell formatting types
//!
//! This module contains types for cell formatting:
//! - [`CellFormat`] - Sparse per-cell formatting record
//! - [`CellFormatStore`] - Formatting records keyed by stable cell identity
//! - [`NumberFormat`] - Number formats and their display transforms
//! - [`Color`] - Color representation

mod alignment;
mod color;
mod number_format;
mod store;

pub use alignment::{HorizontalAlign, VerticalAlign};
pub use color::Color;
pub use number_format::{
    number_to_cell_string, numeric_value, parse_datetime, parse_number, FormatCode,
    NumberFormat, DEFAULT_DECIMAL_PLACES, MAX_DECIMAL_PLACES,
};
pub use store::{CellKey, CellFormatStore};

/// Formatting record for one cell
///
/// Every field is optional; `None` means "inherit" (from the column format,
/// then from the ambient default). Merging a patch only overwrites the
/// fields the patch sets.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct CellFormat {
    /// Bold text
    pub bold: Option<bool>,
    /// Italic text
    pub italic: Option<bool>,
    /// Underlined text
    pub underline: Option<bool>,
    /// Font family name
    pub font_family: Option<String>,
    /// Font size in points
    pub font_size: Option<f64>,
    /// Text color
    pub text_color: Option<Color>,
    /// Background fill color
    pub background_color: Option<Color>,
    /// Horizontal alignment
    pub horizontal_align: Option<HorizontalAlign>,
    /// Vertical alignment
    pub vertical_align: Option<VerticalAlign>,
    /// Wrap text
    pub wrap_text: Option<bool>,
    /// Number format
    pub number_format: Option<NumberFormat>,
    /// Decimal places for numeric formats
    pub decimal_places: Option<u8>,
}

impl CellFormat {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no field is set
    pub fn is_empty(&self) -> bool {
        *self == CellFormat::default()
    }

    /// Overwrite the fields `patch` sets, keep the rest
    pub fn merge(&mut self, patch: &CellFormat) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() {
                    self.$field = patch.$field.clone();
                })*
            };
        }
        take!(
            bold,
            italic,
            underline,
            font_family,
            font_size,
            text_color,
            background_color,
            horizontal_align,
            vertical_align,
            wrap_text,
            number_format,
            decimal_places
        );
    }

    /// This record laid over `base`
    pub fn overlay(&self, base: &CellFormat) -> CellFormat {
        let mut merged = base.clone();
        merged.merge(self);
        merged
    }

    /// Effective number format (General when unset)
    pub fn number_format(&self) -> NumberFormat {
        self.number_format.unwrap_or_default()
    }

    /// Effective decimal places (2 when unset)
    pub fn decimal_places(&self) -> u8 {
        self.decimal_places.unwrap_or(DEFAULT_DECIMAL_PLACES)
    }

    /// Text shown for `raw` under this record's number format
    pub fn display(&self, raw: &str) -> String {
        self.number_format().display(raw, self.decimal_places())
    }

    /// Set bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    /// Set italic
    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    /// Set underline
    pub fn underline(mut self, underline: bool) -> Self {
        self.underline = Some(underline);
        self
    }

    /// Set font family
    pub fn font_family<S: Into<String>>(mut self, family: S) -> Self {
        self.font_family = Some(family.into());
        self
    }

    /// Set font size in points
    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Set text color
    pub fn text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self
    }

    /// Set background color
    pub fn background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    /// Set horizontal alignment
    pub fn horizontal_align(mut self, align: HorizontalAlign) -> Self {
        self.horizontal_align = Some(align);
        self
    }

    /// Set vertical alignment
    pub fn vertical_align(mut self, align: VerticalAlign) -> Self {
        self.vertical_align = Some(align);
        self
    }

    /// Set text wrapping
    pub fn wrap_text(mut self, wrap: bool) -> Self {
        self.wrap_text = Some(wrap);
        self
    }

    /// Set number format
    pub fn with_number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = Some(format);
        self
    }

    /// Set decimal places
    pub fn with_decimal_places(mut self, places: u8) -> Self {
        self.decimal_places = Some(places.min(MAX_DECIMAL_PLACES));
        self
    }
}

impl std::hash::Hash for CellFormat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bold.hash(state);
        self.italic.hash(state);
        self.underline.hash(state);
        self.font_family.hash(state);
        self.font_size.map(f64::to_bits).hash(state);
        self.text_color.hash(state);
        self.background_color.hash(state);
        self.horizontal_align.hash(state);
        self.vertical_align.hash(state);
        self.wrap_text.hash(state);
        self.number_format.hash(state);
        self.decimal_places.hash(state);
    }
}

impl Eq for CellFormat {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_only_overwrites_set_fields() {
        let mut format = CellFormat::new().bold(true).font_size(14.0);
        format.merge(&CellFormat::new().italic(true).font_size(10.0));

        assert_eq!(format.bold, Some(true));
        assert_eq!(format.italic, Some(true));
        assert_eq!(format.font_size, Some(10.0));
        assert_eq!(format.underline, None);
    }

    #[test]
    fn test_overlay_prefers_cell_fields() {
        let column = CellFormat::new()
            .with_number_format(NumberFormat::Currency)
            .bold(true);
        let cell = CellFormat::new().bold(false);
        let effective = cell.overlay(&column);

        assert_eq!(effective.bold, Some(false));
        assert_eq!(effective.number_format(), NumberFormat::Currency);
        assert_eq!(effective.display("1234.5"), "$1,234.50");
    }

    #[test]
    fn test_defaults() {
        let format = CellFormat::new();
        assert!(format.is_empty());
        assert_eq!(format.number_format(), NumberFormat::General);
        assert_eq!(format.decimal_places(), DEFAULT_DECIMAL_PLACES);
        assert!(!CellFormat::new().wrap_text(false).is_empty());
    }
}
