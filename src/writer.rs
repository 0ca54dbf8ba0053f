//! Windowed XLSX writer.
//!
//! Rows are appended in order. At most `window_capacity` of them stay in
//! memory; older rows are serialized to an anonymous temporary file as soon as
//! they leave the window. [`WindowedWriter::finalize`] assembles the package:
//! the fixed workbook parts, then a single worksheet made of the spilled rows
//! followed by the resident ones.

use crate::error::{Error, Result};
use crate::model::CellValue;
use crate::xlsx::{column_letters, MAX_COLUMN, MAX_ROW};
use quick_xml::escape::escape;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Default sheet name of written workbooks.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Totals for one finalized workbook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows: u64,
    /// Rows that went through the spill file
    pub spilled: u64,
}

struct BufferedRow {
    index: u32,
    cells: Vec<CellValue>,
}

/// Streaming workbook writer with a bounded in-memory row window.
pub struct WindowedWriter {
    window_capacity: usize,
    sheet_name: String,
    window: VecDeque<BufferedRow>,
    spill: Option<BufWriter<File>>,
    spilled: u64,
    next_row: u32,
    scratch: String,
}

impl WindowedWriter {
    /// Create a writer keeping at most `window_capacity` rows resident.
    pub fn create(window_capacity: usize) -> Result<Self> {
        if window_capacity == 0 {
            return Err(Error::InvalidConfig(
                "window capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            window_capacity,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            window: VecDeque::with_capacity(window_capacity),
            spill: None,
            spilled: 0,
            next_row: 0,
            scratch: String::new(),
        })
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Append the next row. Returns its zero-based index.
    ///
    /// [`CellValue::Empty`] cells are left out of the sheet but still take
    /// their column position.
    pub fn append_row<I>(&mut self, cells: I) -> Result<u32>
    where
        I: IntoIterator<Item = CellValue>,
    {
        let index = self.next_row;
        if index > MAX_ROW {
            return Err(Error::InvalidConfig(format!(
                "sheet is full ({} rows)",
                MAX_ROW + 1
            )));
        }

        let cells: Vec<CellValue> = cells.into_iter().collect();
        if cells.len() > MAX_COLUMN as usize + 1 {
            return Err(Error::InvalidConfig(format!(
                "row {} has {} cells, more than a sheet holds",
                index + 1,
                cells.len()
            )));
        }

        if self.window.len() == self.window_capacity {
            self.spill_oldest()?;
        }
        self.window.push_back(BufferedRow { index, cells });
        self.next_row += 1;
        Ok(index)
    }

    /// Rows currently held in memory.
    pub fn resident_rows(&self) -> usize {
        self.window.len()
    }

    pub fn spilled_rows(&self) -> u64 {
        self.spilled
    }

    pub fn rows_written(&self) -> u64 {
        u64::from(self.next_row)
    }

    fn spill_oldest(&mut self) -> Result<()> {
        let Some(row) = self.window.pop_front() else {
            return Ok(());
        };

        if self.spill.is_none() {
            log::debug!(
                "window of {} rows full, spilling to a temporary file",
                self.window_capacity
            );
            self.spill = Some(BufWriter::new(tempfile::tempfile()?));
        }

        self.scratch.clear();
        write_row(&mut self.scratch, &row)?;
        if let Some(spill) = self.spill.as_mut() {
            spill.write_all(self.scratch.as_bytes())?;
        }
        self.spilled += 1;
        Ok(())
    }

    /// Write the complete package to `sink` and release the spill file.
    pub fn finalize<W: Write + Seek>(self, sink: W) -> Result<WriteSummary> {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(sink);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS.as_bytes())?;
        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(APP_PROPS.as_bytes())?;
        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml(&self.sheet_name).as_bytes())?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(WORKBOOK_RELS.as_bytes())?;
        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(STYLES.as_bytes())?;
        zip.start_file("xl/sharedStrings.xml", options)?;
        zip.write_all(SHARED_STRINGS.as_bytes())?;

        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(SHEET_HEADER.as_bytes())?;

        if let Some(spill) = self.spill {
            let mut file = spill.into_inner().map_err(|e| e.into_error())?;
            file.seek(SeekFrom::Start(0))?;
            io::copy(&mut file, &mut zip)?;
        }

        let mut xml = String::new();
        for row in &self.window {
            xml.clear();
            write_row(&mut xml, row)?;
            zip.write_all(xml.as_bytes())?;
        }
        zip.write_all(SHEET_FOOTER.as_bytes())?;
        zip.finish()?;

        let summary = WriteSummary {
            rows: u64::from(self.next_row),
            spilled: self.spilled,
        };
        log::info!(
            "wrote {} row(s), {} through the spill file",
            summary.rows,
            summary.spilled
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for WindowedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedWriter")
            .field("window_capacity", &self.window_capacity)
            .field("sheet_name", &self.sheet_name)
            .field("resident", &self.window.len())
            .field("spilled", &self.spilled)
            .finish()
    }
}

fn write_row(out: &mut String, row: &BufferedRow) -> Result<()> {
    let number = row.index + 1;
    let _ = write!(out, "<row r=\"{}\">", number);

    for (column, value) in row.cells.iter().enumerate() {
        let reference = format!("{}{}", column_letters(column as u32), number);
        match value {
            CellValue::Empty => {}
            CellValue::Text(s) => {
                let _ = write!(
                    out,
                    "<c r=\"{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                    reference,
                    escape(s.as_str())
                );
            }
            CellValue::Integer(n) => {
                let _ = write!(out, "<c r=\"{}\"><v>{}</v></c>", reference, n);
            }
            CellValue::Number(n) => {
                if !n.is_finite() {
                    return Err(Error::InvalidValue {
                        reference,
                        value: n.to_string(),
                    });
                }
                let _ = write!(out, "<c r=\"{}\"><v>{}</v></c>", reference, n);
            }
            CellValue::Bool(b) => {
                let _ = write!(
                    out,
                    "<c r=\"{}\" t=\"b\"><v>{}</v></c>",
                    reference,
                    u8::from(*b)
                );
            }
        }
    }

    out.push_str("</row>\n");
    Ok(())
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
        escape(sheet_name)
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const APP_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>sheetflow</Application>
</Properties>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
</styleSheet>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="0" uniqueCount="0"/>"#;

const SHEET_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetData>
"#;

const SHEET_FOOTER: &str = "</sheetData>\n</worksheet>";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Package;
    use std::io::{Cursor, Read};

    fn sheet_xml(bytes: Vec<u8>) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_window_residency_is_bounded() {
        let mut writer = WindowedWriter::create(3).unwrap();
        for i in 0..10i64 {
            let index = writer.append_row([CellValue::Integer(i)]).unwrap();
            assert_eq!(index, i as u32);
            assert!(writer.resident_rows() <= 3);
        }
        assert_eq!(writer.resident_rows(), 3);
        assert_eq!(writer.spilled_rows(), 7);
        assert_eq!(writer.rows_written(), 10);

        let mut out = Cursor::new(Vec::new());
        let summary = writer.finalize(&mut out).unwrap();
        assert_eq!(summary, WriteSummary { rows: 10, spilled: 7 });

        let xml = sheet_xml(out.into_inner());
        let positions: Vec<usize> = (1..=10)
            .map(|r| xml.find(&format!("<row r=\"{}\">", r)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_cell_encoding() {
        let mut row = String::new();
        write_row(
            &mut row,
            &BufferedRow {
                index: 4,
                cells: vec![
                    CellValue::Empty,
                    CellValue::Text("a<b & c".to_string()),
                    CellValue::Number(1.5),
                    CellValue::Bool(true),
                ],
            },
        )
        .unwrap();

        assert!(row.starts_with("<row r=\"5\">"));
        assert!(!row.contains("A5"));
        assert!(row.contains("<c r=\"B5\" t=\"inlineStr\"><is><t xml:space=\"preserve\">a&lt;b &amp; c</t></is></c>"));
        assert!(row.contains("<c r=\"C5\"><v>1.5</v></c>"));
        assert!(row.contains("<c r=\"D5\" t=\"b\"><v>1</v></c>"));
    }

    #[test]
    fn test_non_finite_number_rejected() {
        let mut row = String::new();
        let err = write_row(
            &mut row,
            &BufferedRow {
                index: 0,
                cells: vec![CellValue::Number(f64::NAN)],
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(matches!(
            WindowedWriter::create(0),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_output_opens_as_package() {
        let mut writer = WindowedWriter::create(1).unwrap().with_sheet_name("Widgets & Co");
        writer.append_row(["x".into(), CellValue::Empty]).unwrap();
        let mut out = Cursor::new(Vec::new());
        writer.finalize(&mut out).unwrap();

        let package = Package::from_bytes(out.into_inner()).unwrap();
        assert_eq!(package.sheets().len(), 1);
        assert_eq!(package.sheets()[0].name, "Widgets & Co");
    }
}
