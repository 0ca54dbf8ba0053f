//! ZIP package access for spreadsheet files.
//!
//! A [`Package`] owns the open archive for exactly one pass. Parts are
//! handed out as buffered streams straight from the archive, so no part is
//! ever read into memory as a whole unless a caller asks for it.

use crate::detect;
use crate::error::{Error, Result};
use crate::xlsx::{CommentsTable, SharedStringTable};
use quick_xml::events::Event;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek};
use std::path::{Component, Path};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const COMMENTS_REL_SUFFIX: &str = "/comments";

/// A relationship entry from a .rels file.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative or absolute)
    pub target: String,
    /// Whether the target is external
    pub external: bool,
}

/// Collection of relationships parsed from a .rels file.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    by_id: HashMap<String, Relationship>,
}

impl Relationships {
    /// Get a relationship by ID.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    /// First internal relationship whose type ends with `suffix`.
    pub fn find_by_type_suffix(&self, suffix: &str) -> Option<&Relationship> {
        let mut matches: Vec<&Relationship> = self
            .by_id
            .values()
            .filter(|r| !r.external && r.rel_type.ends_with(suffix))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches.into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn parse<R: BufRead>(source: R) -> Result<Self> {
        let mut rels = Self::default();
        let mut reader = quick_xml::Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"Relationship" => {
                    let mut id = String::new();
                    let mut rel_type = String::new();
                    let mut target = String::new();
                    let mut external = false;

                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value()?;
                        match attr.key.as_ref() {
                            b"Id" => id = value.into_owned(),
                            b"Type" => rel_type = value.into_owned(),
                            b"Target" => target = value.into_owned(),
                            b"TargetMode" => external = value.eq_ignore_ascii_case("external"),
                            _ => {}
                        }
                    }

                    if !id.is_empty() {
                        rels.by_id.insert(
                            id.clone(),
                            Relationship {
                                id,
                                rel_type,
                                target,
                                external,
                            },
                        );
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }
}

/// A worksheet in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDescriptor {
    /// Display name from workbook.xml
    pub name: String,
    /// Zero-based position in the workbook
    pub index: usize,
    /// Archive path of the worksheet part
    pub part_name: String,
}

/// An opened spreadsheet package.
pub struct Package<R = BufReader<File>> {
    archive: zip::ZipArchive<R>,
    sheets: Vec<SheetDescriptor>,
}

impl Package<BufReader<File>> {
    /// Open a package from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sheetflow::container::Package;
    ///
    /// let package = Package::open("widgets.xlsx")?;
    /// for sheet in package.sheets() {
    ///     println!("{}: {}", sheet.index, sheet.name);
    /// }
    /// # Ok::<(), sheetflow::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl Package<Cursor<Vec<u8>>> {
    /// Open a package held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }
}

impl<R: Read + Seek> Package<R> {
    /// Open a package from any seekable reader.
    ///
    /// Fails with a format error if the stream is not a spreadsheet package
    /// or the workbook parts are missing.
    pub fn from_reader(mut reader: R) -> Result<Self> {
        detect::check_zip_magic(&mut reader)?;
        let mut archive = zip::ZipArchive::new(reader)?;
        detect::ensure_spreadsheet(&mut archive)?;

        let rels = match Self::archive_part(&mut archive, WORKBOOK_RELS_PART) {
            Ok(stream) => Relationships::parse(stream)?,
            Err(Error::MissingComponent(_)) => Relationships::default(),
            Err(e) => return Err(e),
        };
        let sheets = {
            let stream = Self::archive_part(&mut archive, WORKBOOK_PART)?;
            Self::parse_workbook(stream, &rels)?
        };

        log::debug!(
            "opened package with {} entries and {} sheets",
            archive.len(),
            sheets.len()
        );

        Ok(Self { archive, sheets })
    }

    fn archive_part<'a>(
        archive: &'a mut zip::ZipArchive<R>,
        path: &str,
    ) -> Result<impl BufRead + 'a> {
        let file = archive.by_name(path).map_err(|e| part_error(path, e))?;
        Ok(BufReader::new(file))
    }

    /// Parse workbook.xml into sheet descriptors.
    fn parse_workbook<S: BufRead>(source: S, rels: &Relationships) -> Result<Vec<SheetDescriptor>> {
        let mut sheets = Vec::new();
        let mut reader = quick_xml::Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"sheet" => {
                    let mut name = String::new();
                    let mut sheet_id = String::new();
                    let mut rel_id = String::new();

                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value()?;
                        match attr.key.local_name().as_ref() {
                            b"name" => name = value.into_owned(),
                            b"sheetId" => sheet_id = value.into_owned(),
                            b"id" => rel_id = value.into_owned(),
                            _ => {}
                        }
                    }

                    let part_name = match rels.get(&rel_id) {
                        Some(rel) => Self::resolve_path(WORKBOOK_PART, &rel.target),
                        None if rels.is_empty() && !sheet_id.is_empty() => {
                            format!("xl/worksheets/sheet{}.xml", sheet_id)
                        }
                        None => {
                            return Err(Error::MissingComponent(format!(
                                "relationship {} for sheet {:?}",
                                rel_id, name
                            )))
                        }
                    };

                    sheets.push(SheetDescriptor {
                        name,
                        index: sheets.len(),
                        part_name,
                    });
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Sheets in document order.
    pub fn sheets(&self) -> &[SheetDescriptor] {
        &self.sheets
    }

    /// Stream the XML of one worksheet.
    pub fn sheet_stream(&mut self, sheet: &SheetDescriptor) -> Result<impl BufRead + '_> {
        Self::archive_part(&mut self.archive, &sheet.part_name)
    }

    /// Stream an arbitrary part.
    pub fn part_stream(&mut self, path: &str) -> Result<impl BufRead + '_> {
        Self::archive_part(&mut self.archive, path)
    }

    /// Build the shared strings table in one streaming pass.
    ///
    /// A package without a shared strings part yields an empty table.
    pub fn shared_strings(&mut self, spill_threshold: Option<usize>) -> Result<SharedStringTable> {
        if !self.exists(SHARED_STRINGS_PART) {
            return Ok(SharedStringTable::default());
        }
        let stream = Self::archive_part(&mut self.archive, SHARED_STRINGS_PART)?;
        let table = SharedStringTable::from_reader(stream, spill_threshold)?;
        log::debug!("loaded {:?}", table);
        Ok(table)
    }

    /// Comments attached to a worksheet, empty when it has none.
    pub fn comments(&mut self, sheet: &SheetDescriptor) -> Result<CommentsTable> {
        let rels = self.read_relationships(&sheet.part_name)?;
        match rels.find_by_type_suffix(COMMENTS_REL_SUFFIX) {
            Some(rel) => {
                let path = Self::resolve_path(&sheet.part_name, &rel.target);
                let stream = Self::archive_part(&mut self.archive, &path)?;
                CommentsTable::from_reader(stream)
            }
            None => Ok(CommentsTable::default()),
        }
    }

    /// Read the relationships of a part, empty when it has none.
    pub fn read_relationships(&mut self, part_path: &str) -> Result<Relationships> {
        let path = Path::new(part_path);
        let parent = path.parent().unwrap_or(Path::new(""));
        let filename = path.file_name().unwrap_or_default().to_string_lossy();
        let rels_path = format!("{}/_rels/{}.rels", parent.display(), filename);

        if !self.exists(&rels_path) {
            return Ok(Relationships::default());
        }
        let stream = Self::archive_part(&mut self.archive, &rels_path)?;
        Relationships::parse(stream)
    }

    /// Check if a file exists in the archive.
    pub fn exists(&self, path: &str) -> bool {
        self.archive.file_names().any(|n| n == path)
    }

    /// List all files in the archive.
    pub fn list_files(&self) -> Vec<String> {
        self.archive.file_names().map(String::from).collect()
    }

    /// Resolve a relative path from a base path.
    pub fn resolve_path(base: &str, relative: &str) -> String {
        if let Some(stripped) = relative.strip_prefix('/') {
            return stripped.to_string();
        }

        let base_dir = Path::new(base).parent().unwrap_or(Path::new(""));
        let mut result = base_dir.to_path_buf();
        for component in Path::new(relative).components() {
            match component {
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(c) => result.push(c),
                _ => {}
            }
        }

        result.to_string_lossy().replace('\\', "/")
    }
}

impl<R> std::fmt::Debug for Package<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("sheets", &self.sheets)
            .finish()
    }
}

/// Only an absent entry is a missing component; read failures stay I/O errors.
fn part_error(path: &str, err: zip::result::ZipError) -> Error {
    match err {
        zip::result::ZipError::FileNotFound => Error::MissingComponent(path.to_string()),
        other => other.into(),
    }
}
