//! A1-style cell references.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Largest column index a worksheet may hold (`XFD`).
pub const MAX_COLUMN: u32 = 16_383;

/// Largest zero-based row index a worksheet may hold.
pub const MAX_ROW: u32 = 1_048_575;

/// Zero-based row/column position parsed from a reference like `B7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a reference such as `B7` or `$B$7`.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = || Error::InvalidCellReference(reference.to_string());

        let body = reference.trim();
        let body = body.strip_prefix('$').unwrap_or(body);
        let split = body
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (letters, digits) = body.split_at(split);
        let digits = digits.strip_prefix('$').unwrap_or(digits);

        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let col = column_index(letters).ok_or_else(invalid)?;
        let row_number: u32 = digits.parse().map_err(|_| invalid())?;
        if row_number == 0 || row_number - 1 > MAX_ROW {
            return Err(invalid());
        }

        Ok(Self {
            row: row_number - 1,
            col,
        })
    }
}

impl FromStr for CellRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

/// Convert column letters (`A`, `AB`, `xfd`) to a zero-based index.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1);
    }
    let index = index - 1;
    (index <= MAX_COLUMN).then_some(index)
}

/// Convert a zero-based column index to its letters.
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::with_capacity(3);
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        assert_eq!(CellRef::parse("A1").unwrap(), CellRef::new(0, 0));
        assert_eq!(CellRef::parse("B7").unwrap(), CellRef::new(6, 1));
        assert_eq!(CellRef::parse("AA10").unwrap(), CellRef::new(9, 26));
        assert_eq!(CellRef::parse("$C$3").unwrap(), CellRef::new(2, 2));
        assert_eq!(CellRef::parse("xfd1").unwrap(), CellRef::new(0, MAX_COLUMN));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "7", "B", "B0", "1B", "B7C", "XFE1", "A1048577", "B-1"] {
            assert!(
                matches!(CellRef::parse(bad), Err(Error::InvalidCellReference(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
        assert_eq!(column_letters(MAX_COLUMN), "XFD");
    }

    #[test]
    fn test_display() {
        assert_eq!(CellRef::new(6, 1).to_string(), "B7");
        assert_eq!(CellRef::new(0, 27).to_string(), "AB1");
    }
}
