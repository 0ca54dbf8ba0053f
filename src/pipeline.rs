//! End-to-end import and export.
//!
//! An import reads the first sheet of a workbook through the configured
//! producer, maps every dense row onto a [`Record`] and hands the records to a
//! [`BatchAccumulator`]. Exports go the other way through a [`WindowedWriter`].

use crate::batch::{BatchAccumulator, BatchStats};
use crate::container::Package;
use crate::error::Result;
use crate::model::{CellEvent, CellValue, Record};
use crate::normalize::RowCallback;
use crate::options::PipelineOptions;
use crate::persist::Backend;
use crate::writer::{WindowedWriter, WriteSummary};
use crate::xlsx::read_rows;
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::time::{Duration, Instant};

/// Totals for one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub sheets: usize,
    /// Rows read, synthesized ones included
    pub rows: u64,
    pub batches: BatchStats,
    pub elapsed: Duration,
}

/// Builds one record per row and forwards it to the accumulator.
struct RecordSink<'b> {
    accumulator: BatchAccumulator<'b>,
    current: Record,
    finished: Option<BatchStats>,
}

impl RowCallback for RecordSink<'_> {
    fn begin_row(&mut self, _row: u32) -> Result<()> {
        self.current = Record::default();
        Ok(())
    }

    fn cell_value(&mut self, cell: CellEvent<'_>) -> Result<()> {
        self.current.apply_cell(&cell)
    }

    fn end_row(&mut self, _row: u32) -> Result<()> {
        self.accumulator.accept(std::mem::take(&mut self.current))
    }

    fn end_input(&mut self) -> Result<()> {
        self.finished = Some(self.accumulator.finish()?);
        Ok(())
    }
}

/// Import a workbook file into `backend`.
pub fn import_file(
    path: impl AsRef<Path>,
    options: &PipelineOptions,
    backend: Backend<'_>,
) -> Result<ImportSummary> {
    let path = path.as_ref();
    log::info!("importing {}", path.display());
    let package = Package::open(path)?;
    import_package(package, options, backend)
}

/// Import a workbook held by any seekable reader.
pub fn import_reader<R: Read + Seek>(
    reader: R,
    options: &PipelineOptions,
    backend: Backend<'_>,
) -> Result<ImportSummary> {
    let package = Package::from_reader(reader)?;
    import_package(package, options, backend)
}

fn import_package<R: Read + Seek>(
    mut package: Package<R>,
    options: &PipelineOptions,
    backend: Backend<'_>,
) -> Result<ImportSummary> {
    options.validate()?;
    let started = Instant::now();

    let mut sink = RecordSink {
        accumulator: BatchAccumulator::new(options.batch_size, backend)?,
        current: Record::default(),
        finished: None,
    };
    let read = read_rows(
        &mut package,
        options.parse_type,
        &options.read_options(),
        &mut sink,
    )?;

    let summary = ImportSummary {
        sheets: read.sheets,
        rows: read.rows,
        batches: sink.finished.unwrap_or_else(|| sink.accumulator.stats()),
        elapsed: started.elapsed(),
    };
    log::info!(
        "imported {} record(s) in {} batch(es) via {} / {} in {:?}",
        summary.batches.accepted,
        summary.batches.flushes,
        options.parse_type,
        options.persistence_type,
        summary.elapsed
    );
    Ok(summary)
}

/// Write records as `id, name` rows, one per record, in iteration order.
pub fn export_records<'r, I, W>(records: I, sink: W, window: usize) -> Result<WriteSummary>
where
    I: IntoIterator<Item = &'r Record>,
    W: Write + Seek,
{
    let mut writer = WindowedWriter::create(window)?;
    for record in records {
        writer.append_row(record.to_cells())?;
    }
    writer.finalize(sink)
}

/// Write `rows` new-record rows: blank identifier, random name.
pub fn write_sample_rows<W: Write + Seek>(
    sink: W,
    rows: usize,
    window: usize,
) -> Result<WriteSummary> {
    let mut writer = WindowedWriter::create(window)?;
    for _ in 0..rows {
        let name = uuid::Uuid::new_v4().to_string();
        writer.append_row([CellValue::Empty, CellValue::Text(name)])?;
    }
    writer.finalize(sink)
}
