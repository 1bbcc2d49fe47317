//! Number formats and their display transforms
//!
//! Formatting is presentation only: [`NumberFormat::display`] turns a stored
//! string into the text shown for it and never changes the stored value.
//! Display follows fixed en-US conventions (`,` grouping, `.` decimals).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Decimal places used when a cell does not set its own
pub const DEFAULT_DECIMAL_PLACES: u8 = 2;

/// Upper bound for decimal places, anything above is clamped
pub const MAX_DECIMAL_PLACES: u8 = 15;

/// Number format picked for a cell or column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberFormat {
    /// No transform (default)
    #[default]
    General,
    /// Grouped thousands, fixed decimals
    Number,
    /// `$` prefix, grouped thousands, fixed decimals
    Currency,
    /// Same display as currency; exported with an accounting format code
    Accounting,
    /// Multiplied by 100 with a `%` suffix
    Percentage,
    /// Exponential notation
    Scientific,
    /// `1/15/2024`
    ShortDate,
    /// `January 15, 2024`
    LongDate,
    /// `3:04:05 PM`
    Time,
    /// Explicit text, no transform
    Text,
}

/// How a number format is written into an XLSX style sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatCode {
    /// Built-in format by ID
    BuiltIn(u32),
    /// Custom format string
    Custom(String),
}

impl FormatCode {
    /// 0 - General
    pub const ID_GENERAL: u32 = 0;
    /// 3 - #,##0
    pub const ID_NUMBER_SEP: u32 = 3;
    /// 4 - #,##0.00
    pub const ID_NUMBER_SEP_DEC2: u32 = 4;
    /// 9 - 0%
    pub const ID_PERCENT_INT: u32 = 9;
    /// 10 - 0.00%
    pub const ID_PERCENT_DEC2: u32 = 10;
    /// 11 - 0.00E+00
    pub const ID_SCIENTIFIC: u32 = 11;
    /// 14 - m/d/yyyy (locale short date)
    pub const ID_DATE_SHORT: u32 = 14;
    /// 19 - h:mm:ss AM/PM
    pub const ID_TIME_AMPM_SEC: u32 = 19;
    /// 49 - @
    pub const ID_TEXT: u32 = 49;
}

impl NumberFormat {
    /// All formats in toolbar order
    pub const ALL: [NumberFormat; 10] = [
        NumberFormat::General,
        NumberFormat::Number,
        NumberFormat::Currency,
        NumberFormat::Accounting,
        NumberFormat::Percentage,
        NumberFormat::Scientific,
        NumberFormat::ShortDate,
        NumberFormat::LongDate,
        NumberFormat::Time,
        NumberFormat::Text,
    ];

    /// Display name as used by the grid toolbar
    pub fn name(&self) -> &'static str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::Number => "Number",
            NumberFormat::Currency => "Currency",
            NumberFormat::Accounting => "Accounting",
            NumberFormat::Percentage => "Percentage",
            NumberFormat::Scientific => "Scientific",
            NumberFormat::ShortDate => "ShortDate",
            NumberFormat::LongDate => "LongDate",
            NumberFormat::Time => "Time",
            NumberFormat::Text => "Text",
        }
    }

    /// Look a format up by name; unrecognized names map to `General`
    ///
    /// Matching ignores case, spaces and underscores, so "Short Date",
    /// "short_date" and "ShortDate" are the same format.
    pub fn from_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "number" => NumberFormat::Number,
            "currency" => NumberFormat::Currency,
            "accounting" => NumberFormat::Accounting,
            "percentage" | "percent" => NumberFormat::Percentage,
            "scientific" => NumberFormat::Scientific,
            "shortdate" => NumberFormat::ShortDate,
            "longdate" => NumberFormat::LongDate,
            "time" => NumberFormat::Time,
            "text" => NumberFormat::Text,
            _ => NumberFormat::General,
        }
    }

    /// Check if this format transforms numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            NumberFormat::Number
                | NumberFormat::Currency
                | NumberFormat::Accounting
                | NumberFormat::Percentage
                | NumberFormat::Scientific
        )
    }

    /// Check if this is a date/time format
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            NumberFormat::ShortDate | NumberFormat::LongDate | NumberFormat::Time
        )
    }

    /// Text shown for `raw` under this format
    ///
    /// Never fails: a value the format cannot interpret is returned unchanged.
    pub fn display(&self, raw: &str, decimal_places: u8) -> String {
        let decimals = decimal_places.min(MAX_DECIMAL_PLACES) as usize;

        match self {
            NumberFormat::General | NumberFormat::Text => raw.to_string(),
            NumberFormat::Number
            | NumberFormat::Currency
            | NumberFormat::Accounting
            | NumberFormat::Percentage
            | NumberFormat::Scientific => match parse_number(raw) {
                Some(n) => self.display_number(n, decimals),
                None => raw.to_string(),
            },
            NumberFormat::ShortDate => match parse_datetime(raw) {
                Some(dt) => dt.format("%-m/%-d/%Y").to_string(),
                None => raw.to_string(),
            },
            NumberFormat::LongDate => match parse_datetime(raw) {
                Some(dt) => dt.format("%B %-d, %Y").to_string(),
                None => raw.to_string(),
            },
            NumberFormat::Time => {
                let time = parse_datetime(raw)
                    .map(|dt| dt.time())
                    .or_else(|| parse_time(raw));
                match time {
                    Some(t) => t.format("%-I:%M:%S %p").to_string(),
                    None => raw.to_string(),
                }
            }
        }
    }

    fn display_number(&self, n: f64, decimals: usize) -> String {
        match self {
            NumberFormat::Number => signed(n, decimals, group_thousands(n.abs(), decimals)),
            NumberFormat::Currency | NumberFormat::Accounting => {
                signed(n, decimals, format!("${}", group_thousands(n.abs(), decimals)))
            }
            NumberFormat::Percentage => format!("{:.*}%", decimals, n * 100.0),
            NumberFormat::Scientific => exponential(n, decimals),
            _ => n.to_string(),
        }
    }

    /// Value written to a spreadsheet cell for `raw`, if it should be numeric
    ///
    /// Numeric formats yield the parsed number, date formats the Excel
    /// serial date. `None` means the raw string is written instead.
    pub fn cell_number(&self, raw: &str) -> Option<f64> {
        match self {
            f if f.is_numeric() => parse_number(raw),
            NumberFormat::ShortDate | NumberFormat::LongDate => {
                parse_datetime(raw).map(excel_serial)
            }
            NumberFormat::Time => parse_datetime(raw)
                .map(excel_serial)
                .or_else(|| parse_time(raw).map(|t| time_fraction(&t))),
            _ => None,
        }
    }

    /// XLSX number format code for this format
    pub fn format_code(&self, decimal_places: u8) -> FormatCode {
        let decimals = decimal_places.min(MAX_DECIMAL_PLACES) as usize;
        let fraction = if decimals == 0 {
            String::new()
        } else {
            format!(".{}", "0".repeat(decimals))
        };

        match self {
            NumberFormat::General => FormatCode::BuiltIn(FormatCode::ID_GENERAL),
            NumberFormat::Text => FormatCode::BuiltIn(FormatCode::ID_TEXT),
            NumberFormat::Number => match decimals {
                0 => FormatCode::BuiltIn(FormatCode::ID_NUMBER_SEP),
                2 => FormatCode::BuiltIn(FormatCode::ID_NUMBER_SEP_DEC2),
                _ => FormatCode::Custom(format!("#,##0{}", fraction)),
            },
            NumberFormat::Currency => FormatCode::Custom(format!("\"$\"#,##0{}", fraction)),
            NumberFormat::Accounting => FormatCode::Custom(format!(
                "_(\"$\"* #,##0{f}_);_(\"$\"* \\(#,##0{f}\\);_(\"$\"* \"-\"??_);_(@_)",
                f = fraction
            )),
            NumberFormat::Percentage => match decimals {
                0 => FormatCode::BuiltIn(FormatCode::ID_PERCENT_INT),
                2 => FormatCode::BuiltIn(FormatCode::ID_PERCENT_DEC2),
                _ => FormatCode::Custom(format!("0{}%", fraction)),
            },
            NumberFormat::Scientific => match decimals {
                2 => FormatCode::BuiltIn(FormatCode::ID_SCIENTIFIC),
                _ => FormatCode::Custom(format!("0{}E+00", fraction)),
            },
            NumberFormat::ShortDate => FormatCode::BuiltIn(FormatCode::ID_DATE_SHORT),
            NumberFormat::LongDate => FormatCode::Custom("mmmm d, yyyy".to_string()),
            NumberFormat::Time => FormatCode::BuiltIn(FormatCode::ID_TIME_AMPM_SEC),
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumberFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NumberFormat::from_name(s))
    }
}

/// Parse a stored cell value as a finite number
///
/// Surrounding whitespace is ignored; empty strings, `NaN` and infinities
/// do not count as numbers.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric value of a cell for sorting and sums (non-numbers count as 0)
pub fn numeric_value(raw: &str) -> f64 {
    parse_number(raw).unwrap_or(0.0)
}

/// Render a number the way it is stored back into a cell
///
/// Integral values have no fraction (`6`, not `6.0`); everything else uses
/// the shortest representation that parses back to the same value.
pub fn number_to_cell_string(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    n.to_string()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

/// Parse a date or date-time string
///
/// RFC 3339 values keep their wall-clock time; bare dates are midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Days since 1899-12-30 (the Excel 1900 date system epoch), with the
/// time of day as the fraction
fn excel_serial(dt: NaiveDateTime) -> f64 {
    let days = match NaiveDate::from_ymd_opt(1899, 12, 30) {
        Some(epoch) => (dt.date() - epoch).num_days() as f64,
        None => 0.0,
    };
    days + time_fraction(&dt.time())
}

fn time_fraction(t: &NaiveTime) -> f64 {
    use chrono::Timelike;
    (t.num_seconds_from_midnight() as f64 + t.nanosecond() as f64 / 1e9) / 86_400.0
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

/// Prefix `-` unless the value rounds to zero at `decimals`
fn signed(n: f64, decimals: usize, magnitude: String) -> String {
    let rounds_to_zero = format!("{:.*}", decimals, n.abs())
        .chars()
        .all(|c| c == '0' || c == '.');
    if n < 0.0 && !rounds_to_zero {
        format!("-{}", magnitude)
    } else {
        magnitude
    }
}

/// `1.23e+4` style exponential notation
fn exponential(n: f64, decimals: usize) -> String {
    let formatted = format!("{:.*e}", decimals, n);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(e) if e < 0 => format!("{}e-{}", mantissa, -e),
            Ok(e) => format!("{}e+{}", mantissa, e),
            Err(_) => formatted.clone(),
        },
        None => formatted,
    }
}
