//! Both producers must deliver the same dense row stream.

mod common;

use common::{cells, collect, workbook};
use sheetflow::normalize::NormalizedRow;
use sheetflow::ParseType;

fn both(bytes: &[u8]) -> Vec<NormalizedRow> {
    let streaming = collect(bytes, ParseType::EventDriven).into_rows();
    let document = collect(bytes, ParseType::WholeDocument).into_rows();
    assert_eq!(streaming, document, "producers disagree");
    streaming
}

#[test]
fn test_missing_row_and_leading_cell() {
    let bytes = workbook(
        r#"<row r="1"><c r="A1"><v>1</v></c><c r="B1" t="inlineStr"><is><t>first</t></is></c></row>
<row r="3"><c r="B3" t="inlineStr"><is><t>third</t></is></c></row>"#,
        None,
    );

    let rows = both(&bytes);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].cells, cells(&[Some("1"), Some("first")]));
    assert_eq!(rows[1].index, 1);
    assert_eq!(rows[1].cells, cells(&[None, None]));
    assert_eq!(rows[2].cells, cells(&[None, Some("third")]));
}

#[test]
fn test_leading_rows_synthesized_trailing_not() {
    let bytes = workbook(r#"<row r="3"><c r="A3"><v>x</v></c></row>"#, None);

    let rows = both(&bytes);
    let indices: Vec<u32> = rows.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(rows[0].cells, cells(&[None, None]));
    assert_eq!(rows[2].cells, cells(&[Some("x"), None]));
}

#[test]
fn test_cell_types_resolve_alike() {
    let bytes = workbook(
        r#"<row r="1"><c r="A1" t="s"><v>1</v></c><c r="B1" t="b"><v>1</v></c><c r="C1" t="str"><v>SUM</v></c><c r="D1" t="e"><v>#N/A</v></c><c r="E1"/></row>
<row r="2"><c r="C2" t="inlineStr"><is><r><t>a</t></r><r><t>b</t></r><rPh><t>ignored</t></rPh></is></c></row>"#,
        Some(r#"<si><t>zero</t></si><si><r><t>o</t></r><r><t>ne</t></r></si>"#),
    );

    let rows = both(&bytes);
    assert_eq!(
        rows[0].cells,
        cells(&[Some("one"), Some("TRUE"), Some("SUM"), Some("#N/A")])
    );
    assert_eq!(rows[1].cells, cells(&[None, None, Some("ab")]));
}

#[test]
fn test_wide_row_keeps_width() {
    let bytes = workbook(
        r#"<row r="1"><c r="A1"><v>a</v></c><c r="E1"><v>e</v></c></row>"#,
        None,
    );

    let rows = both(&bytes);
    assert_eq!(
        rows[0].cells,
        cells(&[Some("a"), None, None, None, Some("e")])
    );
}

#[test]
fn test_empty_sheet_yields_no_rows() {
    let bytes = workbook("", None);
    assert!(both(&bytes).is_empty());
}

#[test]
fn test_unresolved_shared_string_fails_both() {
    let bytes = workbook(r#"<row r="1"><c r="A1" t="s"><v>4</v></c></row>"#, Some("<si><t>only</t></si>"));

    for parse_type in [ParseType::EventDriven, ParseType::WholeDocument] {
        let mut package = sheetflow::Package::from_bytes(bytes.clone()).unwrap();
        let mut rows = sheetflow::normalize::RowCollector::new();
        let err = sheetflow::xlsx::read_rows(
            &mut package,
            parse_type,
            &sheetflow::ReadOptions::default(),
            &mut rows,
        )
        .unwrap_err();
        assert!(
            matches!(err, sheetflow::Error::UnresolvedSharedString { index: 4, len: 1 }),
            "{parse_type}: {err}"
        );
    }
}

#[test]
fn test_row_past_sheet_limit_fails_both() {
    let bytes = workbook(r#"<row r="2000000"><c r="A1"><v>1</v></c></row>"#, None);

    for parse_type in [ParseType::EventDriven, ParseType::WholeDocument] {
        let mut package = sheetflow::Package::from_bytes(bytes.clone()).unwrap();
        let mut rows = sheetflow::normalize::RowCollector::new();
        let err = sheetflow::xlsx::read_rows(
            &mut package,
            parse_type,
            &sheetflow::ReadOptions::default(),
            &mut rows,
        )
        .unwrap_err();
        assert!(
            matches!(err, sheetflow::Error::InvalidCellReference(_)),
            "{parse_type}: {err}"
        );
        assert!(rows.into_rows().is_empty(), "{parse_type}");
    }
}
