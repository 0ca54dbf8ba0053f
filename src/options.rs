//! Pipeline configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a worksheet is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum ParseType {
    /// Stream the sheet XML, one event at a time
    #[default]
    EventDriven,
    /// Load the whole sheet into a document tree first
    WholeDocument,
}

impl TryFrom<String> for ParseType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl FromStr for ParseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "event-driven" | "sax" => Ok(ParseType::EventDriven),
            "whole-document" | "dom" => Ok(ParseType::WholeDocument),
            other => Err(Error::InvalidConfig(format!("unknown parse type {:?}", other))),
        }
    }
}

impl fmt::Display for ParseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseType::EventDriven => "event-driven",
            ParseType::WholeDocument => "whole-document",
        })
    }
}

/// Which persistence strategy receives flushed batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum PersistenceType {
    /// One insert statement and one update statement per batch
    #[default]
    BulkStatement,
    /// Per-record upsert through a session, flushed and cleared per batch
    Session,
}

impl TryFrom<String> for PersistenceType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl FromStr for PersistenceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bulk-statement" | "jdbc" => Ok(PersistenceType::BulkStatement),
            "session" | "jpa" => Ok(PersistenceType::Session),
            other => Err(Error::InvalidConfig(format!(
                "unknown persistence type {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for PersistenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PersistenceType::BulkStatement => "bulk-statement",
            PersistenceType::Session => "session",
        })
    }
}

/// Options for the read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Every emitted row carries at least this many cells
    pub minimum_columns: u32,
    /// Stop after the first sheet
    pub first_sheet_only: bool,
    /// Move the shared strings table to disk past this many entries
    pub shared_string_spill_threshold: Option<usize>,
    /// Deliver cell comments as annotations
    pub read_comments: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            minimum_columns: 2,
            first_sheet_only: true,
            shared_string_spill_threshold: Some(100_000),
            read_comments: true,
        }
    }
}

/// Options for an import or export run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineOptions {
    /// Records per flushed batch
    pub batch_size: usize,
    /// Streaming or load-everything parsing
    pub parse_type: ParseType,
    /// Backend strategy
    pub persistence_type: PersistenceType,
    /// Rows the writer keeps resident before spilling
    pub window_size: usize,
    /// Minimum dense row width
    pub minimum_columns: u32,
    /// Read only the first sheet
    pub first_sheet_only: bool,
    /// Shared strings spill threshold (`null` keeps the table in memory)
    pub shared_string_spill_threshold: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let read = ReadOptions::default();
        Self {
            batch_size: 1000,
            parse_type: ParseType::default(),
            persistence_type: PersistenceType::default(),
            window_size: 100,
            minimum_columns: read.minimum_columns,
            first_sheet_only: read.first_sheet_only,
            shared_string_spill_threshold: read.shared_string_spill_threshold,
        }
    }
}

impl PipelineOptions {
    /// Create new pipeline options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON; missing keys keep their defaults.
    ///
    /// ```
    /// use sheetflow::{ParseType, PipelineOptions};
    ///
    /// let options = PipelineOptions::from_json(r#"{"batchSize": 50, "parseType": "dom"}"#)?;
    /// assert_eq!(options.batch_size, 50);
    /// assert_eq!(options.parse_type, ParseType::WholeDocument);
    /// # Ok::<(), sheetflow::Error>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the parse type.
    pub fn with_parse_type(mut self, parse_type: ParseType) -> Self {
        self.parse_type = parse_type;
        self
    }

    /// Set the persistence type.
    pub fn with_persistence_type(mut self, persistence_type: PersistenceType) -> Self {
        self.persistence_type = persistence_type;
        self
    }

    /// Set the writer window size.
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Set the minimum dense row width.
    pub fn with_minimum_columns(mut self, columns: u32) -> Self {
        self.minimum_columns = columns;
        self
    }

    /// Read every sheet instead of only the first.
    pub fn with_all_sheets(mut self) -> Self {
        self.first_sheet_only = false;
        self
    }

    /// Set the shared strings spill threshold.
    pub fn with_spill_threshold(mut self, threshold: Option<usize>) -> Self {
        self.shared_string_spill_threshold = threshold;
        self
    }

    /// Reject values that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batchSize must be positive".to_string()));
        }
        if self.window_size == 0 {
            return Err(Error::InvalidConfig("windowSize must be positive".to_string()));
        }
        if self.minimum_columns == 0 {
            return Err(Error::InvalidConfig(
                "minimumColumns must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The read-path subset of these options.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            minimum_columns: self.minimum_columns,
            first_sheet_only: self.first_sheet_only,
            shared_string_spill_threshold: self.shared_string_spill_threshold,
            ..ReadOptions::default()
        }
    }
}
