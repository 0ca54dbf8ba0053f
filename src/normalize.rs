//! Gap-filling normalization of sparse sheet rows.
//!
//! Worksheet XML omits empty cells and empty rows. [`GapFiller`] turns the
//! sparse `start_row` / `cell` / `end_row` stream coming from a parser into a
//! dense one: every row index between the first and last present row, and
//! every column up to a configured minimum, reaches the [`RowCallback`],
//! with `None` standing in for anything the source left out.
//!
//! Rows after the last present row are never invented. Only leading and
//! interior gaps are filled.
//!
//! The filler is a plain state machine over the three raw events and does not
//! depend on any XML or archive machinery.

use crate::container::SheetDescriptor;
use crate::error::Result;
use crate::model::CellEvent;
use crate::xlsx::CellRef;

/// Raw row/cell events in document order, as produced by a sheet parser.
pub trait SheetContentsHandler {
    /// A `<row>` element begins. `row` is zero-based.
    fn start_row(&mut self, row: u32) -> Result<()>;

    /// A cell with a value. `reference` is absent when the source omitted it.
    fn cell(
        &mut self,
        reference: Option<&str>,
        value: Option<&str>,
        annotation: Option<&str>,
    ) -> Result<()>;

    /// The current row ends.
    fn end_row(&mut self, row: u32) -> Result<()>;
}

/// Optional behaviors a [`RowCallback`] can switch on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Synthesize all-null rows for row indices the source skipped.
    pub fill_missing_rows: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            fill_missing_rows: true,
        }
    }
}

impl Capabilities {
    pub fn without_row_filling(mut self) -> Self {
        self.fill_missing_rows = false;
        self
    }
}

/// Consumer of the dense row stream.
///
/// Only the three row-level methods are required. Sheet and end-of-input
/// notifications default to no-ops.
pub trait RowCallback {
    fn begin_row(&mut self, row: u32) -> Result<()>;

    fn cell_value(&mut self, cell: CellEvent<'_>) -> Result<()>;

    fn end_row(&mut self, row: u32) -> Result<()>;

    fn begin_sheet(&mut self, _sheet: &SheetDescriptor) -> Result<()> {
        Ok(())
    }

    fn end_sheet(&mut self, _sheet: &SheetDescriptor) -> Result<()> {
        Ok(())
    }

    /// Called once after the last sheet, even when no sheet was read.
    fn end_input(&mut self) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

impl<C: RowCallback + ?Sized> RowCallback for &mut C {
    fn begin_row(&mut self, row: u32) -> Result<()> {
        (**self).begin_row(row)
    }

    fn cell_value(&mut self, cell: CellEvent<'_>) -> Result<()> {
        (**self).cell_value(cell)
    }

    fn end_row(&mut self, row: u32) -> Result<()> {
        (**self).end_row(row)
    }

    fn begin_sheet(&mut self, sheet: &SheetDescriptor) -> Result<()> {
        (**self).begin_sheet(sheet)
    }

    fn end_sheet(&mut self, sheet: &SheetDescriptor) -> Result<()> {
        (**self).end_sheet(sheet)
    }

    fn end_input(&mut self) -> Result<()> {
        (**self).end_input()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }
}

/// Turns sparse sheet events into a dense row stream for one sheet.
pub struct GapFiller<'c> {
    callback: &'c mut dyn RowCallback,
    minimum_columns: u32,
    fill_missing_rows: bool,
    last_row: Option<u32>,
    last_column: Option<u32>,
    rows_emitted: u64,
}

impl<'c> GapFiller<'c> {
    pub fn new(callback: &'c mut dyn RowCallback, minimum_columns: u32) -> Self {
        let fill_missing_rows = callback.capabilities().fill_missing_rows;
        Self {
            callback,
            minimum_columns,
            fill_missing_rows,
            last_row: None,
            last_column: None,
            rows_emitted: 0,
        }
    }

    /// Rows delivered so far, synthesized ones included.
    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }

    fn current_row(&self) -> u32 {
        self.last_row.unwrap_or(0)
    }

    fn emit_null(&mut self, row: u32, column: u32) -> Result<()> {
        let reference = CellRef::new(row, column).to_string();
        self.callback.cell_value(CellEvent {
            row,
            column,
            value: None,
            reference: &reference,
            annotation: None,
        })
    }

    fn emit_missing_row(&mut self, row: u32) -> Result<()> {
        self.callback.begin_row(row)?;
        for column in 0..self.minimum_columns {
            self.emit_null(row, column)?;
        }
        self.callback.end_row(row)?;
        self.rows_emitted += 1;
        Ok(())
    }
}

impl SheetContentsHandler for GapFiller<'_> {
    fn start_row(&mut self, row: u32) -> Result<()> {
        if self.fill_missing_rows {
            let first_missing = self.last_row.map_or(0, |r| r.saturating_add(1));
            for missing in first_missing..row {
                self.emit_missing_row(missing)?;
            }
        }

        self.last_row = Some(row);
        self.last_column = None;
        self.callback.begin_row(row)
    }

    fn cell(
        &mut self,
        reference: Option<&str>,
        value: Option<&str>,
        annotation: Option<&str>,
    ) -> Result<()> {
        let row = self.current_row();
        let next_column = self.last_column.map_or(0, |c| c + 1);
        let (column, generated);
        let reference = match reference {
            Some(r) => {
                column = CellRef::parse(r)?.col;
                r
            }
            None => {
                column = next_column;
                generated = CellRef::new(row, column).to_string();
                generated.as_str()
            }
        };

        for missing in next_column..column {
            self.emit_null(row, missing)?;
        }
        // an out-of-order cell never rewinds the row's width
        self.last_column = Some(self.last_column.map_or(column, |c| c.max(column)));

        self.callback.cell_value(CellEvent {
            row,
            column,
            value,
            reference,
            annotation,
        })
    }

    fn end_row(&mut self, row: u32) -> Result<()> {
        let row_index = self.current_row();
        let next_column = self.last_column.map_or(0, |c| c + 1);
        for missing in next_column..self.minimum_columns {
            self.emit_null(row_index, missing)?;
        }
        self.callback.end_row(row)?;
        self.rows_emitted += 1;
        Ok(())
    }
}

/// A dense row: slot `i` holds column `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRow {
    pub index: u32,
    pub cells: Vec<Option<String>>,
}

/// Collects the dense stream into memory. Meant for previews and tests.
#[derive(Debug, Default)]
pub struct RowCollector {
    rows: Vec<NormalizedRow>,
    capabilities: Capabilities,
}

impl RowCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            rows: Vec::new(),
            capabilities,
        }
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<NormalizedRow> {
        self.rows
    }
}

impl RowCallback for RowCollector {
    fn begin_row(&mut self, row: u32) -> Result<()> {
        self.rows.push(NormalizedRow {
            index: row,
            cells: Vec::new(),
        });
        Ok(())
    }

    fn cell_value(&mut self, cell: CellEvent<'_>) -> Result<()> {
        if let Some(current) = self.rows.last_mut() {
            let slot = cell.column as usize;
            if current.cells.len() <= slot {
                current.cells.resize(slot + 1, None);
            }
            current.cells[slot] = cell.value.map(str::to_string);
        }
        Ok(())
    }

    fn end_row(&mut self, _row: u32) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
