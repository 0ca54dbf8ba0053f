//! Normalized row producers.
//!
//! Both producers deliver the same dense row contract to a [`RowCallback`]:
//! shared strings are loaded once, then each sheet is announced, its rows go
//! through a [`GapFiller`], and a final `end_input` closes the pass.

use super::document::DocumentReader;
use super::{CommentsTable, SharedStringTable, SheetEventParser};
use crate::container::{Package, SheetDescriptor};
use crate::error::Result;
use crate::normalize::{GapFiller, RowCallback};
use crate::options::{ParseType, ReadOptions};
use std::io::{Read, Seek};

/// Totals for one read pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    /// Sheets visited
    pub sheets: usize,
    /// Rows delivered, synthesized ones included
    pub rows: u64,
}

/// Produces the dense row stream of a package.
pub trait RowProducer {
    fn produce<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        callback: &mut dyn RowCallback,
    ) -> Result<ReadSummary>;
}

/// Per-sheet context handed to a producer's sheet routine.
pub(crate) struct SheetContext<'a> {
    pub sheet: &'a SheetDescriptor,
    pub strings: &'a SharedStringTable,
    pub comments: &'a CommentsTable,
}

/// The pass skeleton shared by both producers.
pub(crate) fn drive<R, F>(
    package: &mut Package<R>,
    options: &ReadOptions,
    callback: &mut dyn RowCallback,
    mut parse_sheet: F,
) -> Result<ReadSummary>
where
    R: Read + Seek,
    F: FnMut(&mut Package<R>, &SheetContext<'_>, &mut GapFiller<'_>) -> Result<()>,
{
    let strings = package.shared_strings(options.shared_string_spill_threshold)?;
    let limit = if options.first_sheet_only { 1 } else { usize::MAX };
    let sheets: Vec<SheetDescriptor> = package.sheets().iter().take(limit).cloned().collect();

    let mut summary = ReadSummary::default();
    for sheet in &sheets {
        let comments = if options.read_comments {
            package.comments(sheet)?
        } else {
            CommentsTable::default()
        };

        log::debug!("reading sheet {} ({:?})", sheet.index, sheet.name);
        callback.begin_sheet(sheet)?;
        let rows = {
            let mut filler = GapFiller::new(&mut *callback, options.minimum_columns);
            let context = SheetContext {
                sheet,
                strings: &strings,
                comments: &comments,
            };
            parse_sheet(package, &context, &mut filler)?;
            filler.rows_emitted()
        };
        callback.end_sheet(sheet)?;

        summary.sheets += 1;
        summary.rows += rows;
    }
    callback.end_input()?;

    Ok(summary)
}

/// Event-driven producer: the sheet is never held in memory.
#[derive(Debug, Clone, Default)]
pub struct StreamingReader {
    options: ReadOptions,
}

impl StreamingReader {
    pub fn new(options: ReadOptions) -> Self {
        Self { options }
    }
}

impl RowProducer for StreamingReader {
    fn produce<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        callback: &mut dyn RowCallback,
    ) -> Result<ReadSummary> {
        drive(package, &self.options, callback, |package, context, filler| {
            let parser = SheetEventParser::new(context.strings).with_comments(context.comments);
            let stream = package.sheet_stream(context.sheet)?;
            parser.parse(stream, filler)
        })
    }
}

/// Read a package with the producer selected by `parse_type`.
pub fn read_rows<R: Read + Seek>(
    package: &mut Package<R>,
    parse_type: ParseType,
    options: &ReadOptions,
    callback: &mut dyn RowCallback,
) -> Result<ReadSummary> {
    match parse_type {
        ParseType::EventDriven => StreamingReader::new(options.clone()).produce(package, callback),
        ParseType::WholeDocument => DocumentReader::new(options.clone()).produce(package, callback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::RowCollector;
    use crate::writer::WindowedWriter;
    use std::io::Cursor;

    fn written_package(rows: &[Vec<&str>]) -> Package<Cursor<Vec<u8>>> {
        let mut writer = WindowedWriter::create(2).unwrap();
        for row in rows {
            writer
                .append_row(row.iter().map(|v| (*v).into()))
                .unwrap();
        }
        let mut out = Cursor::new(Vec::new());
        writer.finalize(&mut out).unwrap();
        Package::from_bytes(out.into_inner()).unwrap()
    }

    #[test]
    fn test_streaming_reader_summary() {
        let mut package = written_package(&[vec!["1", "a"], vec!["2", "b"], vec!["3", "c"]]);
        let mut collector = RowCollector::new();
        let summary = StreamingReader::default()
            .produce(&mut package, &mut collector)
            .unwrap();

        assert_eq!(summary, ReadSummary { sheets: 1, rows: 3 });
        assert_eq!(
            collector.rows()[2].cells,
            vec![Some("3".to_string()), Some("c".to_string())]
        );
    }
}
