//! Error types for the sheetflow library.

use std::io;
use thiserror::Error;

/// Result type alias for sheetflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing or persisting spreadsheet rows.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error on the archive, a spill file or an output sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not a spreadsheet package.
    #[error("Unknown file format")]
    UnknownFormat,

    /// Error reading or writing the ZIP archive.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// Error parsing XML content.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// A required package part is missing.
    #[error("Missing component: {0}")]
    MissingComponent(String),

    /// A cell reference such as `B7` could not be parsed.
    #[error("Invalid cell reference: {0:?}")]
    InvalidCellReference(String),

    /// A shared string index points past the end of the table.
    #[error("Shared string index {index} out of range (table has {len} entries)")]
    UnresolvedSharedString { index: usize, len: usize },

    /// A cell value could not be mapped onto a record field.
    #[error("Invalid value {value:?} at {reference}")]
    InvalidValue { reference: String, value: String },

    /// The persistence backend rejected a batch.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid pipeline or writer configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed container, unresolvable shared string, unparseable reference.
    Format,
    /// Archive or backing storage access failure.
    Io,
    /// Backend rejected a batch.
    Persistence,
    /// Rejected before any input was touched.
    Config,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Persistence(_) => ErrorKind::Persistence,
            Error::InvalidConfig(_) => ErrorKind::Config,
            Error::UnknownFormat
            | Error::ZipArchive(_)
            | Error::XmlParse(_)
            | Error::MissingComponent(_)
            | Error::InvalidCellReference(_)
            | Error::UnresolvedSharedString { .. }
            | Error::InvalidValue { .. } => ErrorKind::Format,
        }
    }

    /// Whether this error belongs to the format family.
    pub fn is_format(&self) -> bool {
        self.kind() == ErrorKind::Format
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            other => Error::ZipArchive(other.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(e) => Error::Io(io::Error::new(e.kind(), e.to_string())),
            other => Error::XmlParse(other.to_string()),
        }
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.into())
        } else {
            Error::InvalidConfig(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownFormat;
        assert_eq!(err.to_string(), "Unknown file format");

        let err = Error::UnresolvedSharedString { index: 9, len: 3 };
        assert_eq!(
            err.to_string(),
            "Shared string index 9 out of range (table has 3 entries)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_kinds() {
        assert!(Error::InvalidCellReference("1A".to_string()).is_format());
        assert!(Error::MissingComponent("xl/workbook.xml".to_string()).is_format());
        assert_eq!(
            Error::Persistence("rejected".to_string()).kind(),
            ErrorKind::Persistence
        );
        assert_eq!(
            Error::InvalidConfig("batch size".to_string()).kind(),
            ErrorKind::Config
        );
    }
}
