//! Whole-document producer.
//!
//! Reads a worksheet part completely, parses it into a `roxmltree` tree and
//! builds an in-memory [`Worksheet`] before replaying it through the gap
//! filler. Simpler to reason about than the streaming path, but memory grows
//! with the sheet.

use super::events::{parse_row_number, resolve_value};
use super::reader::{drive, ReadSummary, RowProducer, SheetContext};
use super::{CommentsTable, SharedStringTable};
use crate::container::Package;
use crate::error::Result;
use crate::normalize::{RowCallback, SheetContentsHandler};
use crate::options::ReadOptions;
use roxmltree::Node;
use std::collections::BTreeMap;
use std::io::{Read, Seek};

/// A cell that carried a value in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCell {
    pub reference: Option<String>,
    pub value: String,
    pub annotation: Option<String>,
}

/// All rows of one sheet, keyed by zero-based row index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worksheet {
    pub rows: BTreeMap<u32, Vec<SheetCell>>,
}

impl Worksheet {
    /// Parse worksheet XML held in memory.
    pub fn parse(
        xml: &str,
        strings: &SharedStringTable,
        comments: &CommentsTable,
    ) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        let mut sheet = Self::default();

        let Some(sheet_data) = doc
            .root_element()
            .children()
            .find(|n| n.has_tag_name_local("sheetData"))
        else {
            return Ok(sheet);
        };

        let mut next_row = 0;
        for row in sheet_data.children().filter(|n| n.has_tag_name_local("row")) {
            let index = match row.attribute("r") {
                Some(raw) => parse_row_number(raw)?,
                None => next_row,
            };
            next_row = index + 1;

            let cells = sheet.rows.entry(index).or_default();
            for cell in row.children().filter(|n| n.has_tag_name_local("c")) {
                let Some(raw) = cell_text(cell) else {
                    continue;
                };
                let reference = cell.attribute("r").map(str::to_string);
                let value = resolve_value(cell.attribute("t"), &raw, strings)?;
                let annotation = reference
                    .as_deref()
                    .and_then(|r| comments.get(r))
                    .map(str::to_string);
                cells.push(SheetCell {
                    reference,
                    value,
                    annotation,
                });
            }
        }

        Ok(sheet)
    }

    /// Replay the sheet as raw row events, rows in index order.
    pub fn replay<H: SheetContentsHandler + ?Sized>(&self, handler: &mut H) -> Result<()> {
        for (&row, cells) in &self.rows {
            handler.start_row(row)?;
            for cell in cells {
                handler.cell(
                    cell.reference.as_deref(),
                    Some(&cell.value),
                    cell.annotation.as_deref(),
                )?;
            }
            handler.end_row(row)?;
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

trait LocalName {
    fn has_tag_name_local(&self, name: &str) -> bool;
}

impl LocalName for Node<'_, '_> {
    fn has_tag_name_local(&self, name: &str) -> bool {
        self.is_element() && self.tag_name().name() == name
    }
}

/// Raw value text of a `<c>` element, `None` when it has no value element.
fn cell_text(cell: Node<'_, '_>) -> Option<String> {
    if let Some(v) = cell.children().find(|n| n.has_tag_name_local("v")) {
        return Some(v.text().unwrap_or_default().to_string());
    }

    let inline = cell.children().find(|n| n.has_tag_name_local("is"))?;
    let mut text: Option<String> = None;
    for t in inline.descendants().filter(|n| n.has_tag_name_local("t")) {
        let phonetic = t.ancestors().any(|a| a.has_tag_name_local("rPh"));
        if !phonetic {
            text.get_or_insert_with(String::new)
                .push_str(t.text().unwrap_or_default());
        }
    }
    text
}

/// Load-everything producer.
#[derive(Debug, Clone, Default)]
pub struct DocumentReader {
    options: ReadOptions,
}

impl DocumentReader {
    pub fn new(options: ReadOptions) -> Self {
        Self { options }
    }
}

impl RowProducer for DocumentReader {
    fn produce<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        callback: &mut dyn RowCallback,
    ) -> Result<ReadSummary> {
        drive(
            package,
            &self.options,
            callback,
            |package, context: &SheetContext<'_>, filler| {
                let mut xml = String::new();
                package.sheet_stream(context.sheet)?.read_to_string(&mut xml)?;
                let sheet = Worksheet::parse(&xml, context.strings, context.comments)?;
                log::debug!(
                    "loaded sheet {:?} with {} rows",
                    context.sheet.name,
                    sheet.row_count()
                );
                sheet.replay(filler)
            },
        )
    }
}
