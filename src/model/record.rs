//! Domain records built from normalized rows.

use super::{CellEvent, CellValue};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Column holding the record identifier.
pub const ID_COLUMN: u32 = 0;

/// Column holding the record name.
pub const NAME_COLUMN: u32 = 1;

/// Number of columns a record row spans.
pub const RECORD_COLUMNS: usize = 2;

/// A row of the widget table.
///
/// A record without an identifier is new and takes the insert path; one with
/// an identifier updates the existing row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
}

impl Record {
    /// A record that has not been stored yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// A record referring to a stored row.
    pub fn existing(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Copy one cell into the matching field; other columns are ignored.
    pub fn apply_cell(&mut self, cell: &CellEvent<'_>) -> Result<()> {
        match cell.column {
            ID_COLUMN => self.id = parse_identifier(cell)?,
            NAME_COLUMN => self.name = cell.value.unwrap_or_default().to_string(),
            _ => {}
        }
        Ok(())
    }

    /// Cells written for this record, in column order.
    pub fn to_cells(&self) -> Vec<CellValue> {
        vec![self.id.into(), CellValue::Text(self.name.clone())]
    }
}

/// Blank → absent; integral numbers (`7`, `7.0`) → present; else an error.
fn parse_identifier(cell: &CellEvent<'_>) -> Result<Option<i64>> {
    let Some(raw) = cell.non_blank() else {
        return Ok(None);
    };

    if let Ok(id) = raw.parse::<i64>() {
        return Ok(Some(id));
    }

    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            Ok(Some(n as i64))
        }
        _ => Err(Error::InvalidValue {
            reference: cell.reference.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(column: u32, value: Option<&str>) -> CellEvent<'_> {
        CellEvent {
            row: 0,
            column,
            value,
            reference: "A1",
            annotation: None,
        }
    }

    #[test]
    fn test_apply_cells() {
        let mut record = Record::default();
        record.apply_cell(&cell(0, Some("42"))).unwrap();
        record.apply_cell(&cell(1, Some("gear"))).unwrap();
        record.apply_cell(&cell(2, Some("ignored"))).unwrap();
        assert_eq!(record, Record::existing(42, "gear"));
        assert!(!record.is_new());
    }

    #[test]
    fn test_identifier_parsing() {
        let mut record = Record::default();
        for (raw, expected) in [
            (None, None),
            (Some(""), None),
            (Some("  "), None),
            (Some("7"), Some(7)),
            (Some("7.0"), Some(7)),
            (Some("-3"), Some(-3)),
        ] {
            record.apply_cell(&cell(0, raw)).unwrap();
            assert_eq!(record.id, expected, "for {raw:?}");
        }

        assert!(matches!(
            record.apply_cell(&cell(0, Some("7.5"))),
            Err(Error::InvalidValue { .. })
        ));
        assert!(record.apply_cell(&cell(0, Some("abc"))).unwrap_err().is_format());
    }

    #[test]
    fn test_missing_name_is_empty() {
        let mut record = Record::new("old");
        record.apply_cell(&cell(1, None)).unwrap();
        assert_eq!(record.name, "");
        assert!(record.is_new());
    }

    #[test]
    fn test_to_cells() {
        assert_eq!(
            Record::new("a").to_cells(),
            vec![CellValue::Empty, CellValue::Text("a".to_string())]
        );
        assert_eq!(
            Record::existing(5, "b").to_cells(),
            vec![CellValue::Integer(5), CellValue::Text("b".to_string())]
        );
    }
}
