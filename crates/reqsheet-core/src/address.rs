//! Column letters and A1-style cell references
//!
//! Grids address columns by name, but the exported worksheet is
//! header-less and only knows column letters (A, B, ..., Z, AA, ...).

use crate::error::{Error, Result};

/// Largest column index an XLSX worksheet can hold (XFD)
pub const MAX_COLUMN_INDEX: usize = 16_383;

/// Convert a 0-based column index to letters (0 = A, 25 = Z, 26 = AA)
pub fn column_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col + 1;

    while n > 0 {
        n -= 1;
        let c = ((n % 26) as u8 + b'A') as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Convert column letters to a 0-based index (A = 0, Z = 25, AA = 26)
pub fn letters_to_column(letters: &str) -> Result<usize> {
    if letters.is_empty() {
        return Err(Error::InvalidAddress("empty column letters".into()));
    }

    let mut col: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!(
                "invalid column letter '{}' in '{}'",
                c, letters
            )));
        }
        col = col * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
        if col > MAX_COLUMN_INDEX + 1 {
            return Err(Error::InvalidAddress(format!(
                "column '{}' beyond XFD",
                letters
            )));
        }
    }

    Ok(col - 1)
}

/// Format a 0-based (row, column) pair as an A1 reference
pub fn to_a1(row: usize, col: usize) -> String {
    format!("{}{}", column_to_letters(col), row + 1)
}

/// Parse an A1 reference ("B3") into a 0-based (row, column) pair
///
/// `$` markers are accepted and ignored.
pub fn parse_a1(s: &str) -> Result<(usize, usize)> {
    let s = s.trim();
    let bytes = s.as_bytes();
    let mut pos = 0;

    if bytes.get(pos) == Some(&b'$') {
        pos += 1;
    }
    let col_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
        pos += 1;
    }
    let col = letters_to_column(&s[col_start..pos])
        .map_err(|_| Error::InvalidAddress(s.to_string()))?;

    if bytes.get(pos) == Some(&b'$') {
        pos += 1;
    }
    let row: usize = s[pos..]
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
    if row == 0 {
        return Err(Error::InvalidAddress(format!(
            "row number must be >= 1 in '{}'",
            s
        )));
    }

    Ok((row - 1, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_to_letters() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(25), "Z");
        assert_eq!(column_to_letters(26), "AA");
        assert_eq!(column_to_letters(701), "ZZ");
        assert_eq!(column_to_letters(702), "AAA");
        assert_eq!(column_to_letters(MAX_COLUMN_INDEX), "XFD");
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(letters_to_column("A").unwrap(), 0);
        assert_eq!(letters_to_column("z").unwrap(), 25);
        assert_eq!(letters_to_column("AA").unwrap(), 26);
        assert_eq!(letters_to_column("XFD").unwrap(), MAX_COLUMN_INDEX);
        assert!(letters_to_column("").is_err());
        assert!(letters_to_column("A1").is_err());
        assert!(letters_to_column("XFE").is_err());
    }

    #[test]
    fn test_a1_roundtrip() {
        assert_eq!(to_a1(0, 0), "A1");
        assert_eq!(to_a1(9, 27), "AB10");
        assert_eq!(parse_a1("AB10").unwrap(), (9, 27));
        assert_eq!(parse_a1("$C$3").unwrap(), (2, 2));
        assert!(parse_a1("C0").is_err());
        assert!(parse_a1("12").is_err());
    }
}
