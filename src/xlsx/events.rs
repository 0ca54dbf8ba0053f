//! Push-based worksheet parser.
//!
//! Drives a `quick-xml` pull reader over one worksheet stream and pushes
//! `start_row` / `cell` / `end_row` events into a [`SheetContentsHandler`] in
//! strict document order. Memory use is bounded by the size of one cell.

use super::{CommentsTable, SharedStringTable, MAX_ROW};
use crate::error::{Error, Result};
use crate::normalize::SheetContentsHandler;
use quick_xml::events::{BytesStart, Event};
use std::io::BufRead;

/// Decode a cell's raw text according to its `t` attribute.
pub(crate) fn resolve_value(
    cell_type: Option<&str>,
    raw: &str,
    strings: &SharedStringTable,
) -> Result<String> {
    match cell_type {
        Some("s") => strings.resolve_str(raw),
        Some("b") => Ok(if raw.trim() == "1" { "TRUE" } else { "FALSE" }.to_string()),
        // Error codes (#DIV/0!), inline and formula strings, numbers and
        // ISO dates all pass through as written.
        _ => Ok(raw.to_string()),
    }
}

/// Parse the `r` attribute of a `<row>` element into a zero-based index.
pub(crate) fn parse_row_number(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 && n - 1 <= MAX_ROW => Ok(n - 1),
        _ => Err(Error::InvalidCellReference(format!("row {}", raw))),
    }
}

#[derive(Default)]
struct PendingCell {
    reference: Option<String>,
    cell_type: Option<String>,
    value: Option<String>,
}

/// Streams one worksheet into a [`SheetContentsHandler`].
pub struct SheetEventParser<'a> {
    strings: &'a SharedStringTable,
    comments: Option<&'a CommentsTable>,
}

impl<'a> SheetEventParser<'a> {
    pub fn new(strings: &'a SharedStringTable) -> Self {
        Self {
            strings,
            comments: None,
        }
    }

    /// Attach comments to be delivered as cell annotations.
    pub fn with_comments(mut self, comments: &'a CommentsTable) -> Self {
        self.comments = Some(comments);
        self
    }

    pub fn parse<R, H>(&self, source: R, handler: &mut H) -> Result<()>
    where
        R: BufRead,
        H: SheetContentsHandler + ?Sized,
    {
        let mut reader = quick_xml::Reader::from_reader(source);

        let mut buf = Vec::new();
        let mut next_row: u32 = 0;
        let mut current_row: Option<u32> = None;
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_inline = false;
        let mut phonetic_depth = 0usize;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"row" => {
                        let row = Self::row_index(&e, next_row)?;
                        handler.start_row(row)?;
                        current_row = Some(row);
                        next_row = row + 1;
                    }
                    b"c" if current_row.is_some() => cell = Some(Self::pending_cell(&e)?),
                    b"v" if cell.is_some() => {
                        Self::open_value(&mut cell);
                        in_value = true;
                    }
                    b"is" if cell.is_some() => in_inline = true,
                    b"rPh" if in_inline => phonetic_depth += 1,
                    b"t" if in_inline && phonetic_depth == 0 => {
                        Self::open_value(&mut cell);
                        in_value = true;
                    }
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"row" => {
                        let row = Self::row_index(&e, next_row)?;
                        handler.start_row(row)?;
                        handler.end_row(row)?;
                        next_row = row + 1;
                    }
                    // An explicit empty value is an empty string; a cell
                    // with no value element at all stays absent.
                    b"v" if cell.is_some() => Self::open_value(&mut cell),
                    b"t" if in_inline && phonetic_depth == 0 => Self::open_value(&mut cell),
                    _ => {}
                },
                Event::Text(e) if in_value => {
                    if let Some(pending) = cell.as_mut() {
                        pending
                            .value
                            .get_or_insert_with(String::new)
                            .push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) if in_value => {
                    if let Some(pending) = cell.as_mut() {
                        pending
                            .value
                            .get_or_insert_with(String::new)
                            .push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"v" => in_value = false,
                    b"t" => in_value = false,
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"is" => in_inline = false,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            self.emit_cell(pending, handler)?;
                        }
                        in_value = false;
                        in_inline = false;
                    }
                    b"row" => {
                        if let Some(row) = current_row.take() {
                            handler.end_row(row)?;
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    fn open_value(cell: &mut Option<PendingCell>) {
        if let Some(pending) = cell.as_mut() {
            pending.value.get_or_insert_with(String::new);
        }
    }

    fn row_index(e: &BytesStart<'_>, next_row: u32) -> Result<u32> {
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == b"r" {
                return parse_row_number(&attr.unescape_value()?);
            }
        }
        Ok(next_row)
    }

    fn pending_cell(e: &BytesStart<'_>) -> Result<PendingCell> {
        let mut pending = PendingCell::default();
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"r" => pending.reference = Some(attr.unescape_value()?.into_owned()),
                b"t" => pending.cell_type = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }
        Ok(pending)
    }

    fn emit_cell<H>(&self, pending: PendingCell, handler: &mut H) -> Result<()>
    where
        H: SheetContentsHandler + ?Sized,
    {
        let Some(raw) = pending.value else {
            return Ok(());
        };
        let value = resolve_value(pending.cell_type.as_deref(), &raw, self.strings)?;
        let annotation = match (self.comments, pending.reference.as_deref()) {
            (Some(comments), Some(reference)) => comments.get(reference),
            _ => None,
        };
        handler.cell(pending.reference.as_deref(), Some(&value), annotation)
    }
}
