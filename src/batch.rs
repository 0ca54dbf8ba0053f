//! Fixed-size batching in front of a persistence backend.

use crate::error::{Error, Result};
use crate::model::Record;
use crate::persist::Backend;

/// Counters for one accumulator run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Records accepted
    pub accepted: u64,
    /// Records the backend reported as committed
    pub committed: u64,
    /// Flushes made, the closing one included
    pub flushes: u64,
    /// Size of the last flushed batch
    pub last_flush_size: usize,
}

/// Collects records and hands them to a backend `capacity` at a time.
///
/// The pending batch never holds more than `capacity` records. A failed flush
/// drops the batch it was writing and returns the error; nothing is retried.
#[derive(Debug)]
pub struct BatchAccumulator<'b> {
    capacity: usize,
    batch: Vec<Record>,
    backend: Backend<'b>,
    stats: BatchStats,
}

impl<'b> BatchAccumulator<'b> {
    pub fn new(capacity: usize, backend: Backend<'b>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "batch capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            batch: Vec::with_capacity(capacity),
            backend,
            stats: BatchStats::default(),
        })
    }

    /// Add a record, flushing when the batch becomes full.
    pub fn accept(&mut self, record: Record) -> Result<()> {
        self.batch.push(record);
        self.stats.accepted += 1;
        if self.batch.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Persist the pending batch, even when it is empty.
    pub fn flush(&mut self) -> Result<usize> {
        let batch = std::mem::take(&mut self.batch);
        let size = batch.len();

        let committed = self.backend.persist(&batch)?;
        log::debug!(
            "flushed {} record(s) via {}, {} committed",
            size,
            self.backend.persistence_type(),
            committed
        );

        self.stats.flushes += 1;
        self.stats.committed += committed as u64;
        self.stats.last_flush_size = size;

        // reuse the allocation for the next batch
        self.batch = batch;
        self.batch.clear();
        Ok(committed)
    }

    /// Final flush of whatever is pending.
    pub fn finish(&mut self) -> Result<BatchStats> {
        self.flush()?;
        Ok(self.stats)
    }

    pub fn pending(&self) -> &[Record] {
        &self.batch
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }
}
