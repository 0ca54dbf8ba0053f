//! Spreadsheet package detection.

use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// ZIP file magic bytes: PK\x03\x04
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Content type for the XLSX workbook part.
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";

/// Content type for the macro-enabled workbook part.
const XLSM_CONTENT_TYPE: &str = "application/vnd.ms-excel.sheet.macroEnabled.main+xml";

/// Check if data starts with ZIP magic bytes.
pub fn is_zip_file(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZIP_MAGIC
}

/// Peek at the first bytes of a reader and rewind it.
///
/// Fails with [`Error::UnknownFormat`] when the stream is not a ZIP archive.
pub fn check_zip_magic<R: Read + Seek>(reader: &mut R) -> Result<()> {
    let start = reader.stream_position()?;
    let mut magic = [0u8; 4];
    let read = read_up_to(reader, &mut magic)?;
    reader.seek(SeekFrom::Start(start))?;

    if is_zip_file(&magic[..read]) {
        Ok(())
    } else {
        Err(Error::UnknownFormat)
    }
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Verify that an opened archive holds a spreadsheet.
///
/// Inspects `[Content_Types].xml` first and falls back to the presence of
/// `xl/workbook.xml` for packages written without a workbook override.
pub fn ensure_spreadsheet<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<()> {
    let content_types = match archive.by_name("[Content_Types].xml") {
        Ok(mut file) => {
            let mut text = String::new();
            file.read_to_string(&mut text)?;
            text
        }
        Err(_) => return Err(Error::MissingComponent("[Content_Types].xml".to_string())),
    };

    if content_types.contains(XLSX_CONTENT_TYPE) || content_types.contains(XLSM_CONTENT_TYPE) {
        return Ok(());
    }

    if archive.file_names().any(|n| n == "xl/workbook.xml") {
        Ok(())
    } else {
        Err(Error::UnknownFormat)
    }
}
