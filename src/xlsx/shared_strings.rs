//! XLSX shared strings table.
//!
//! The table is built in a single streaming pass over `xl/sharedStrings.xml`.
//! Once it grows past the spill threshold the strings move into an anonymous
//! temporary file and are resolved by offset, so very large pools do not
//! stay resident.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufWriter, Read, Seek, SeekFrom, Write};

enum Storage {
    Memory(Vec<String>),
    Disk(DiskStrings),
}

/// Strings stored back to back in a temporary file.
struct DiskStrings {
    file: RefCell<File>,
    /// Byte offset of each string; the entry at `len` is the end of the file.
    offsets: Vec<u64>,
    writer: Option<BufWriter<File>>,
}

impl DiskStrings {
    fn create(strings: Vec<String>) -> Result<Self> {
        let file = tempfile::tempfile()?;
        let writer = BufWriter::new(file.try_clone()?);
        let mut disk = Self {
            file: RefCell::new(file),
            offsets: vec![0],
            writer: Some(writer),
        };
        for s in strings {
            disk.push(&s)?;
        }
        Ok(disk)
    }

    fn push(&mut self, s: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::InvalidConfig("shared strings table is sealed".to_string()))?;
        writer.write_all(s.as_bytes())?;
        let end = self.offsets.last().copied().unwrap_or(0) + s.len() as u64;
        self.offsets.push(end);
        Ok(())
    }

    fn seal(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn get(&self, index: usize) -> Result<String> {
        let start = self.offsets[index];
        let end = self.offsets[index + 1];
        let mut bytes = vec![0u8; (end - start) as usize];

        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut bytes)?;

        String::from_utf8(bytes).map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// Shared strings table, resolved by zero-based index.
pub struct SharedStringTable {
    storage: Storage,
}

impl Default for SharedStringTable {
    fn default() -> Self {
        Self {
            storage: Storage::Memory(Vec::new()),
        }
    }
}

impl SharedStringTable {
    /// Build a table that never spills.
    pub fn from_strings(strings: Vec<String>) -> Self {
        Self {
            storage: Storage::Memory(strings),
        }
    }

    /// Parse shared strings from XML content held in memory.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes(), None)
    }

    /// Stream `<si>` entries from a reader.
    ///
    /// With `spill_threshold = Some(n)` the table moves to disk as soon as it
    /// holds more than `n` strings.
    pub fn from_reader<R: BufRead>(source: R, spill_threshold: Option<usize>) -> Result<Self> {
        let mut reader = quick_xml::Reader::from_reader(source);

        let mut storage = Storage::Memory(Vec::new());
        let mut buf = Vec::new();
        let mut in_si = false;
        let mut in_t = false;
        // Depth inside <rPh> (phonetic run), whose text is not part of the value.
        let mut phonetic_depth = 0usize;
        let mut current_text = String::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_text.clear();
                    }
                    b"rPh" if in_si => phonetic_depth += 1,
                    b"t" if in_si && phonetic_depth == 0 => in_t = true,
                    _ => {}
                },
                Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                    Self::push(&mut storage, String::new(), spill_threshold)?;
                }
                Event::Text(e) if in_t => {
                    current_text.push_str(&e.unescape()?);
                }
                Event::CData(e) if in_t => {
                    current_text.push_str(&String::from_utf8_lossy(&e));
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"si" => {
                        Self::push(
                            &mut storage,
                            std::mem::take(&mut current_text),
                            spill_threshold,
                        )?;
                        in_si = false;
                    }
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"t" => in_t = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Storage::Disk(ref mut disk) = storage {
            disk.seal()?;
        }

        Ok(Self { storage })
    }

    fn push(storage: &mut Storage, s: String, spill_threshold: Option<usize>) -> Result<()> {
        match storage {
            Storage::Memory(strings) => {
                strings.push(s);
                if let Some(limit) = spill_threshold {
                    if strings.len() > limit {
                        log::debug!(
                            "shared strings exceed {} entries, moving table to disk",
                            limit
                        );
                        let disk = DiskStrings::create(std::mem::take(strings))?;
                        *storage = Storage::Disk(disk);
                    }
                }
                Ok(())
            }
            Storage::Disk(disk) => disk.push(&s),
        }
    }

    /// Resolve a string by index.
    ///
    /// An index outside the table is a format error, never a silent default.
    pub fn resolve(&self, index: usize) -> Result<String> {
        let len = self.len();
        if index >= len {
            return Err(Error::UnresolvedSharedString { index, len });
        }
        match &self.storage {
            Storage::Memory(strings) => Ok(strings[index].clone()),
            Storage::Disk(disk) => disk.get(index),
        }
    }

    /// Resolve the textual index stored in a `t="s"` cell.
    pub fn resolve_str(&self, raw: &str) -> Result<String> {
        let index = raw.trim().parse::<usize>().map_err(|_| Error::InvalidValue {
            reference: "shared string index".to_string(),
            value: raw.to_string(),
        })?;
        self.resolve(index)
    }

    /// Get the count of shared strings.
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Memory(strings) => strings.len(),
            Storage::Disk(disk) => disk.len(),
        }
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the table has been moved to a temporary file.
    pub fn is_disk_backed(&self) -> bool {
        matches!(self.storage, Storage::Disk(_))
    }
}

impl std::fmt::Debug for SharedStringTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStringTable")
            .field("len", &self.len())
            .field("disk_backed", &self.is_disk_backed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="5" uniqueCount="4">
    <si><t>Hello</t></si>
    <si><t xml:space="preserve"> World </t></si>
    <si><t>Fish &amp; Chips</t></si>
    <si/>
</sst>"#;

    #[test]
    fn test_parse_shared_strings() {
        let ss = SharedStringTable::parse(SST).unwrap();
        assert_eq!(ss.len(), 4);
        assert_eq!(ss.resolve(0).unwrap(), "Hello");
        assert_eq!(ss.resolve(1).unwrap(), " World ");
        assert_eq!(ss.resolve(2).unwrap(), "Fish & Chips");
        assert_eq!(ss.resolve(3).unwrap(), "");
        assert!(matches!(
            ss.resolve(4),
            Err(Error::UnresolvedSharedString { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_rich_text_skips_phonetic_runs() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <si>
        <r><t>Hello</t></r>
        <r><t>World</t></r>
        <rPh sb="0" eb="1"><t>ignored</t></rPh>
    </si>
</sst>"#;

        let ss = SharedStringTable::parse(xml).unwrap();
        assert_eq!(ss.len(), 1);
        assert_eq!(ss.resolve(0).unwrap(), "HelloWorld");
    }

    #[test]
    fn test_spills_to_disk() {
        let ss = SharedStringTable::from_reader(SST.as_bytes(), Some(2)).unwrap();
        assert!(ss.is_disk_backed());
        assert_eq!(ss.len(), 4);
        assert_eq!(ss.resolve(0).unwrap(), "Hello");
        assert_eq!(ss.resolve(2).unwrap(), "Fish & Chips");
        assert_eq!(ss.resolve(1).unwrap(), " World ");
        assert_eq!(ss.resolve(3).unwrap(), "");
        assert!(ss.resolve(4).is_err());
    }

    #[test]
    fn test_resolve_str() {
        let ss = SharedStringTable::from_strings(vec!["a".to_string()]);
        assert_eq!(ss.resolve_str(" 0 ").unwrap(), "a");
        assert!(matches!(ss.resolve_str("x"), Err(Error::InvalidValue { .. })));
        assert!(ss.resolve_str("1").unwrap_err().is_format());
    }
}
