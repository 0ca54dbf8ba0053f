//! In-memory widget table.

use super::{BulkStatements, Session};
use crate::error::{Error, Result};
use crate::model::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Width of the `name` column.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 50;

/// A widget table with an identifier sequence.
///
/// Implements both backend contracts, so one store can be driven either way.
/// The committed rows and the sequence serialize to JSON, which the CLI uses
/// as its store file. Session-tracked state never serializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryTable {
    rows: BTreeMap<i64, String>,
    next_id: i64,
    #[serde(skip, default = "default_max_name_length")]
    max_name_length: usize,
    #[serde(skip)]
    staged: Vec<Record>,
}

fn default_max_name_length() -> usize {
    DEFAULT_MAX_NAME_LENGTH
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            staged: Vec::new(),
        }
    }
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the name column width.
    pub fn with_max_name_length(mut self, length: usize) -> Self {
        self.max_name_length = length;
        self
    }

    /// Load a table saved with [`MemoryTable::save_to`]; a missing file is an empty table.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;
        Ok(table)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.rows.get(&id).map(String::as_str)
    }

    /// Committed rows in identifier order.
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|(&id, name)| Record::existing(id, name.clone()))
            .collect()
    }

    /// Records staged in the session and not yet flushed.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Remove every row and restart the identifier sequence.
    pub fn truncate(&mut self) {
        self.rows.clear();
        self.staged.clear();
        self.next_id = 1;
    }

    /// Run `f` as one unit: on error the table returns to its prior state.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let rows = self.rows.clone();
        let next_id = self.next_id;

        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("rolling back: {}", e);
                self.rows = rows;
                self.next_id = next_id;
                self.staged.clear();
                Err(e)
            }
        }
    }

    fn check(&self, record: &Record) -> Result<()> {
        let length = record.name.chars().count();
        if length > self.max_name_length {
            return Err(Error::Persistence(format!(
                "value too long for name ({} > {}): {:?}",
                length, self.max_name_length, record.name
            )));
        }
        Ok(())
    }

    /// The identifier after `id`, if the sequence has room for it.
    fn successor(id: i64) -> Result<i64> {
        id.checked_add(1)
            .ok_or_else(|| Error::Persistence(format!("identifier sequence exhausted at {}", id)))
    }

    fn insert(&mut self, name: &str) -> Result<i64> {
        let id = self.next_id;
        self.next_id = Self::successor(id)?;
        self.rows.insert(id, name.to_string());
        Ok(id)
    }

    fn upsert(&mut self, record: &Record) -> Result<()> {
        match record.id {
            Some(id) => {
                if id >= self.next_id {
                    self.next_id = Self::successor(id)?;
                }
                self.rows.insert(id, record.name.clone());
            }
            None => {
                self.insert(&record.name)?;
            }
        }
        Ok(())
    }
}

impl BulkStatements for MemoryTable {
    fn insert_all(&mut self, records: &[&Record]) -> Result<usize> {
        for record in records {
            self.check(record)?;
        }
        let count = i64::try_from(records.len()).unwrap_or(i64::MAX);
        if self.next_id.checked_add(count).is_none() {
            return Err(Error::Persistence(format!(
                "identifier sequence exhausted at {}",
                self.next_id
            )));
        }
        for record in records {
            self.insert(&record.name)?;
        }
        Ok(records.len())
    }

    fn update_all(&mut self, records: &[&Record]) -> Result<usize> {
        for record in records {
            self.check(record)?;
        }

        let mut affected = 0;
        for record in records {
            if let Some(name) = record.id.and_then(|id| self.rows.get_mut(&id)) {
                name.clone_from(&record.name);
                affected += 1;
            }
        }
        Ok(affected)
    }
}

impl Session for MemoryTable {
    fn save(&mut self, record: &Record) -> Result<()> {
        self.staged.push(record.clone());
        Ok(())
    }

    /// Write the staged records. The stage is emptied whether or not the
    /// write succeeds.
    fn flush(&mut self) -> Result<usize> {
        let staged = std::mem::take(&mut self.staged);
        for record in &staged {
            self.check(record)?;
        }
        for record in &staged {
            self.upsert(record)?;
        }
        Ok(staged.len())
    }

    fn clear(&mut self) {
        self.staged.clear();
    }
}
