//! XLSX worksheet reading.
//!
//! This module turns the worksheet parts of a [`Package`](crate::Package)
//! into a dense row stream, either by streaming the XML or by loading each
//! sheet as a document first.
//!
//! # Example
//!
//! ```no_run
//! use sheetflow::normalize::RowCollector;
//! use sheetflow::xlsx::{RowProducer, StreamingReader};
//! use sheetflow::{Package, ReadOptions};
//!
//! let mut package = Package::open("widgets.xlsx")?;
//! let mut rows = RowCollector::new();
//! let summary = StreamingReader::new(ReadOptions::default()).produce(&mut package, &mut rows)?;
//!
//! println!("{} rows from {} sheet(s)", summary.rows, summary.sheets);
//! # Ok::<(), sheetflow::Error>(())
//! ```

mod cell_ref;
mod comments;
mod document;
mod events;
mod reader;
mod shared_strings;

pub use cell_ref::{column_index, column_letters, CellRef, MAX_COLUMN, MAX_ROW};
pub use comments::CommentsTable;
pub use document::{DocumentReader, SheetCell, Worksheet};
pub use events::SheetEventParser;
pub use reader::{read_rows, ReadSummary, RowProducer, StreamingReader};
pub use shared_strings::SharedStringTable;
