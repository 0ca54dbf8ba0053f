//! Persistence backends for flushed record batches.
//!
//! A store exposes one or both of two contracts:
//!
//! - [`BulkStatements`]: one insert statement for new records and one update
//!   statement for existing records, per batch.
//! - [`Session`]: per-record upsert into a tracking session, followed by a
//!   session-wide flush and clear after every batch so tracked state does not
//!   grow with the input.
//!
//! [`Backend`] picks one of them for a whole run.

mod memory;

pub use memory::{MemoryTable, DEFAULT_MAX_NAME_LENGTH};

use crate::error::Result;
use crate::model::Record;
use crate::options::PersistenceType;

/// Statement-per-batch persistence.
pub trait BulkStatements {
    /// Insert records without identifiers. Returns rows inserted.
    fn insert_all(&mut self, records: &[&Record]) -> Result<usize>;

    /// Update records by identifier. Returns rows affected.
    fn update_all(&mut self, records: &[&Record]) -> Result<usize>;
}

/// Object-tracking persistence.
pub trait Session {
    /// Stage an insert (no identifier) or update (identifier) of one record.
    fn save(&mut self, record: &Record) -> Result<()>;

    /// Write all staged changes. Returns records written.
    fn flush(&mut self) -> Result<usize>;

    /// Forget everything the session tracks.
    fn clear(&mut self);
}

/// The backend strategy for one run.
pub enum Backend<'a> {
    BulkStatement(&'a mut dyn BulkStatements),
    Session(&'a mut dyn Session),
}

impl<'a> Backend<'a> {
    /// Pick the strategy named by configuration over a store offering both.
    pub fn select<S>(persistence_type: PersistenceType, store: &'a mut S) -> Self
    where
        S: BulkStatements + Session,
    {
        match persistence_type {
            PersistenceType::BulkStatement => Backend::BulkStatement(store),
            PersistenceType::Session => Backend::Session(store),
        }
    }

    pub fn persistence_type(&self) -> PersistenceType {
        match self {
            Backend::BulkStatement(_) => PersistenceType::BulkStatement,
            Backend::Session(_) => PersistenceType::Session,
        }
    }

    /// Persist one batch, keeping arrival order within each path.
    ///
    /// An empty batch is a no-op. Returns the number of records committed.
    pub fn persist(&mut self, batch: &[Record]) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        match self {
            Backend::BulkStatement(store) => {
                let (new, existing): (Vec<&Record>, Vec<&Record>) =
                    batch.iter().partition(|r| r.is_new());
                let inserted = if new.is_empty() { 0 } else { store.insert_all(&new)? };
                let updated = if existing.is_empty() {
                    0
                } else {
                    store.update_all(&existing)?
                };
                Ok(inserted + updated)
            }
            Backend::Session(session) => {
                let written = batch
                    .iter()
                    .try_for_each(|record| session.save(record))
                    .and_then(|()| session.flush());
                // a failed batch must not stay tracked for the next one
                session.clear();
                written
            }
        }
    }
}

impl std::fmt::Debug for Backend<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Backend")
            .field(&self.persistence_type())
            .finish()
    }
}
