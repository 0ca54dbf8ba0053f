//! Batching and routing behavior of a full import.

mod common;

use common::workbook;
use sheetflow::persist::{Backend, BulkStatements, MemoryTable, Session};
use sheetflow::{import_reader, write_sample_rows, Error, PersistenceType, PipelineOptions, Record};
use std::io::Cursor;

/// Remembers every backend call.
#[derive(Default)]
struct CallLog {
    inserts: Vec<Vec<String>>,
    updates: Vec<Vec<(i64, String)>>,
    flushed: Vec<usize>,
    staged: usize,
}

impl BulkStatements for CallLog {
    fn insert_all(&mut self, records: &[&Record]) -> sheetflow::Result<usize> {
        self.inserts
            .push(records.iter().map(|r| r.name.clone()).collect());
        Ok(records.len())
    }

    fn update_all(&mut self, records: &[&Record]) -> sheetflow::Result<usize> {
        self.updates.push(
            records
                .iter()
                .filter_map(|r| r.id.map(|id| (id, r.name.clone())))
                .collect(),
        );
        Ok(records.len())
    }
}

impl Session for CallLog {
    fn save(&mut self, _record: &Record) -> sheetflow::Result<()> {
        self.staged += 1;
        Ok(())
    }

    fn flush(&mut self) -> sheetflow::Result<usize> {
        self.flushed.push(self.staged);
        Ok(self.staged)
    }

    fn clear(&mut self) {
        self.staged = 0;
    }
}

fn sample(rows: usize) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    write_sample_rows(&mut out, rows, 10).unwrap();
    out.into_inner()
}

#[test]
fn test_batch_sizes_follow_capacity() {
    for (rows, capacity, expected) in [
        (10, 3, vec![3, 3, 3, 1]),
        (9, 3, vec![3, 3, 3]),
        (2, 5, vec![2]),
    ] {
        let mut log = CallLog::default();
        let options = PipelineOptions::new().with_batch_size(capacity);
        let summary = import_reader(
            Cursor::new(sample(rows)),
            &options,
            Backend::BulkStatement(&mut log),
        )
        .unwrap();

        let sizes: Vec<usize> = log.inserts.iter().map(Vec::len).collect();
        assert_eq!(sizes, expected, "{rows} rows / {capacity}");
        assert_eq!(summary.batches.accepted, rows as u64);
        // the closing flush always runs, empty or not
        assert_eq!(summary.batches.flushes, (rows / capacity + 1) as u64);
        assert_eq!(summary.batches.last_flush_size, rows % capacity);
    }
}

#[test]
fn test_session_flushes_and_clears_per_batch() {
    let mut log = CallLog::default();
    let options = PipelineOptions::new()
        .with_batch_size(4)
        .with_persistence_type(PersistenceType::Session);
    import_reader(
        Cursor::new(sample(10)),
        &options,
        Backend::Session(&mut log),
    )
    .unwrap();

    assert_eq!(log.flushed, vec![4, 4, 2]);
    assert!(log.inserts.is_empty());
}

#[test]
fn test_identifier_routing() {
    let bytes = workbook(
        r#"<row r="1"><c r="A1"><v>7</v></c><c r="B1" t="inlineStr"><is><t>seven</t></is></c></row>
<row r="2"><c r="B2" t="inlineStr"><is><t>fresh</t></is></c></row>
<row r="3"><c r="A3"><v>9.0</v></c><c r="B3" t="inlineStr"><is><t>nine</t></is></c></row>
<row r="4"><c r="A4" t="inlineStr"><is><t> </t></is></c><c r="B4" t="inlineStr"><is><t>blank</t></is></c></row>"#,
        None,
    );

    let mut log = CallLog::default();
    import_reader(
        Cursor::new(bytes),
        &PipelineOptions::default(),
        Backend::BulkStatement(&mut log),
    )
    .unwrap();

    assert_eq!(log.inserts, vec![vec!["fresh".to_string(), "blank".to_string()]]);
    assert_eq!(
        log.updates,
        vec![vec![(7, "seven".to_string()), (9, "nine".to_string())]]
    );
}

#[test]
fn test_bad_identifier_stops_import() {
    let bytes = workbook(
        r#"<row r="1"><c r="A1" t="inlineStr"><is><t>abc</t></is></c><c r="B1"><v>x</v></c></row>"#,
        None,
    );

    let mut table = MemoryTable::new();
    let err = import_reader(
        Cursor::new(bytes),
        &PipelineOptions::default(),
        Backend::select(PersistenceType::BulkStatement, &mut table),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
    assert!(err.is_format());
}

#[test]
fn test_late_failure_rolls_back_earlier_batches() {
    let long_name = "x".repeat(60);
    let mut rows = String::new();
    for i in 1..=5 {
        let name = if i == 5 { long_name.as_str() } else { "ok" };
        rows.push_str(&format!(
            r#"<row r="{i}"><c r="B{i}" t="inlineStr"><is><t>{name}</t></is></c></row>"#
        ));
    }
    let bytes = workbook(&rows, None);

    let mut table = MemoryTable::new();
    table.insert_all(&[&Record::new("existing")]).unwrap();

    let options = PipelineOptions::new().with_batch_size(2);
    let result = table.transaction(|t| {
        import_reader(
            Cursor::new(bytes),
            &options,
            Backend::select(options.persistence_type, t),
        )
    });

    assert!(matches!(result, Err(Error::Persistence(_))));
    assert_eq!(table.records(), vec![Record::existing(1, "existing")]);
}

#[test]
fn test_failed_session_batch_does_not_poison_the_store() {
    use sheetflow::BatchAccumulator;

    let mut table = MemoryTable::new().with_max_name_length(3);
    {
        let mut acc = BatchAccumulator::new(1, Backend::Session(&mut table)).unwrap();
        let err = acc.accept(Record::new("toolong")).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }
    assert_eq!(table.staged_len(), 0);

    let mut acc = BatchAccumulator::new(1, Backend::Session(&mut table)).unwrap();
    acc.accept(Record::new("ok")).unwrap();
    let stats = acc.finish().unwrap();
    assert_eq!(stats.committed, 1);
    assert_eq!(table.get(1), Some("ok"));
}

#[test]
fn test_identifier_at_sequence_limit_fails_cleanly() {
    let bytes = workbook(
        r#"<row r="1"><c r="A1"><v>9223372036854775807</v></c><c r="B1" t="inlineStr"><is><t>max</t></is></c></row>"#,
        None,
    );

    let mut table = MemoryTable::new();
    let options = PipelineOptions::new().with_persistence_type(PersistenceType::Session);
    let err = import_reader(
        Cursor::new(bytes),
        &options,
        Backend::select(options.persistence_type, &mut table),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(table.staged_len(), 0);
}
