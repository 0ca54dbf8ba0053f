//! Cell-level model structures.

use serde::{Deserialize, Serialize};

/// A typed value handed to the writer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    /// No cell is written; readers see a gap.
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Integer(n)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// One normalized cell delivered to a [`RowCallback`](crate::RowCallback).
///
/// Synthesized cells carry `value: None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEvent<'a> {
    pub row: u32,
    pub column: u32,
    pub value: Option<&'a str>,
    pub reference: &'a str,
    pub annotation: Option<&'a str>,
}

impl CellEvent<'_> {
    /// Value with blank text treated as absent.
    pub fn non_blank(&self) -> Option<&str> {
        self.value.map(str::trim).filter(|v| !v.is_empty())
    }
}
