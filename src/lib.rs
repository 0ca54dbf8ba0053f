//! # sheetflow
//!
//! Streaming spreadsheet ingestion and export.
//!
//! This library reads XLSX workbooks as a dense row stream, maps rows onto
//! records, persists them in fixed-size batches and writes records back out
//! with a bounded memory window.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sheetflow::persist::{Backend, MemoryTable};
//! use sheetflow::{import_file, PipelineOptions};
//!
//! let options = PipelineOptions::default();
//! let mut table = MemoryTable::load_from("widgets.json")?;
//!
//! let summary = table.transaction(|t| {
//!     import_file("widgets.xlsx", &options, Backend::select(options.persistence_type, t))
//! })?;
//! println!("{} records in {} batches", summary.batches.accepted, summary.batches.flushes);
//!
//! table.save_to("widgets.json")?;
//! # Ok::<(), sheetflow::Error>(())
//! ```
//!
//! ## Reading Rows Directly
//!
//! ```no_run
//! use sheetflow::normalize::RowCollector;
//! use sheetflow::{read_file, ParseType};
//!
//! let mut rows = RowCollector::new();
//! read_file("widgets.xlsx", ParseType::EventDriven, &mut rows)?;
//! for row in rows.rows() {
//!     println!("{}: {:?}", row.index, row.cells);
//! }
//! # Ok::<(), sheetflow::Error>(())
//! ```

pub mod batch;
pub mod container;
pub mod detect;
pub mod error;
pub mod model;
pub mod normalize;
pub mod options;
pub mod persist;
pub mod pipeline;
pub mod writer;
pub mod xlsx;

// Re-exports
pub use batch::{BatchAccumulator, BatchStats};
pub use container::{Package, Relationship, Relationships, SheetDescriptor};
pub use error::{Error, ErrorKind, Result};
pub use model::{CellEvent, CellValue, Record};
pub use normalize::{Capabilities, GapFiller, RowCallback, SheetContentsHandler};
pub use options::{ParseType, PersistenceType, PipelineOptions, ReadOptions};
pub use pipeline::{export_records, import_file, import_reader, write_sample_rows, ImportSummary};
pub use writer::{WindowedWriter, WriteSummary};
pub use xlsx::ReadSummary;

use std::path::Path;

/// Read a workbook file with default read options.
///
/// # Example
///
/// ```no_run
/// use sheetflow::normalize::RowCollector;
/// use sheetflow::{read_file, ParseType};
///
/// let mut rows = RowCollector::new();
/// let summary = read_file("widgets.xlsx", ParseType::WholeDocument, &mut rows)?;
/// assert_eq!(summary.rows as usize, rows.rows().len());
/// # Ok::<(), sheetflow::Error>(())
/// ```
pub fn read_file(
    path: impl AsRef<Path>,
    parse_type: ParseType,
    callback: &mut dyn RowCallback,
) -> Result<ReadSummary> {
    let mut package = Package::open(path)?;
    xlsx::read_rows(&mut package, parse_type, &ReadOptions::default(), callback)
}
