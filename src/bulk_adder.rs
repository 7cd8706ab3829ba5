//! Scoped mutator that batches directory appends into a single flush.
//!
//! Appending thousands of entries one at a time through
//! [`crate::Container::add_data`] costs one directory rewrite per
//! call — O(N) work repeated N times. A `BulkAdder` writes each
//! payload immediately (so the content region is always consistent)
//! but defers the directory rewrite until the guard goes out of scope,
//! guaranteeing exactly one flush no matter how the scope ends.

use crate::entry::EntryRecord;
use crate::error::Result;

/// Implemented by containers that can be driven through a
/// [`BulkAdder`]. Not part of the public [`crate::Container`] trait:
/// these are the raw, non-flushing primitives a bulk session needs,
/// plus a way to perform the one deferred flush.
pub trait BulkMutable {
    /// Count of entries currently in the directory.
    fn bulk_entry_count(&self) -> usize;

    /// Write `bytes` and insert a data entry at `index`, without
    /// flushing the directory.
    fn bulk_add_data_at(&mut self, index: usize, name: &str, bytes: &[u8]) -> Result<EntryRecord>;

    /// Insert a marker entry at `index`, without flushing the
    /// directory.
    fn bulk_add_marker_at(&mut self, index: usize, name: &str) -> Result<EntryRecord>;

    /// Perform the single deferred flush. Idempotent: calling it more
    /// than once must be harmless, since both `release` and `Drop`
    /// may end up invoking it.
    fn bulk_flush(&mut self) -> Result<()>;
}

impl BulkMutable for crate::FileContainer {
    fn bulk_entry_count(&self) -> usize {
        crate::Container::entry_count(self)
    }

    fn bulk_add_data_at(&mut self, index: usize, name: &str, bytes: &[u8]) -> Result<EntryRecord> {
        self.add_data_at_raw(index, name, bytes)
    }

    fn bulk_add_marker_at(&mut self, index: usize, name: &str) -> Result<EntryRecord> {
        self.add_marker_at_raw(index, name)
    }

    fn bulk_flush(&mut self) -> Result<()> {
        self.flush_directory()
    }
}

impl BulkMutable for crate::BufferContainer {
    fn bulk_entry_count(&self) -> usize {
        crate::Container::entry_count(self)
    }

    fn bulk_add_data_at(&mut self, index: usize, name: &str, bytes: &[u8]) -> Result<EntryRecord> {
        self.add_data_at_raw(index, name, bytes)
    }

    fn bulk_add_marker_at(&mut self, index: usize, name: &str) -> Result<EntryRecord> {
        self.add_marker_at_raw(index, name)
    }

    fn bulk_flush(&mut self) -> Result<()> {
        // Nothing to do: a BufferContainer has no standalone on-disk
        // directory to rewrite until the caller calls
        // `flush_to_file`/`flush_to_stream`.
        Ok(())
    }
}

/// RAII guard that batches [`crate::Container::add_data`]/
/// [`crate::Container::add_marker`] calls against a container,
/// flushing the directory exactly once when the guard is released or
/// dropped.
///
/// Cannot be nested: it holds the container by exclusive borrow for
/// its whole scope, so a second `BulkAdder` over the same container
/// can't be created while one is live.
pub struct BulkAdder<'a, C: BulkMutable> {
    container: &'a mut C,
    flushed: bool,
}

impl<'a, C: BulkMutable> BulkAdder<'a, C> {
    /// Begin a bulk-append scope over `container`.
    pub fn new(container: &'a mut C) -> Self {
        BulkAdder {
            container,
            flushed: false,
        }
    }

    /// Append a data entry, writing its payload immediately but
    /// skipping the directory flush.
    pub fn add_data(&mut self, name: &str, bytes: &[u8]) -> Result<EntryRecord> {
        let at = self.container.bulk_entry_count();
        self.container.bulk_add_data_at(at, name, bytes)
    }

    /// Append a marker entry, skipping the directory flush.
    pub fn add_marker(&mut self, name: &str) -> Result<EntryRecord> {
        let at = self.container.bulk_entry_count();
        self.container.bulk_add_marker_at(at, name)
    }

    /// End the bulk session, performing the single deferred flush and
    /// surfacing any failure to the caller. Prefer this over letting
    /// the guard merely drop when the caller can act on a flush error.
    pub fn release(mut self) -> Result<()> {
        self.do_flush()
    }

    fn do_flush(&mut self) -> Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;
        self.container.bulk_flush()
    }
}

impl<C: BulkMutable> Drop for BulkAdder<'_, C> {
    fn drop(&mut self) {
        // Guaranteed on every exit path, including unwinding. A drop-time
        // flush failure cannot be propagated from here; `release()` is
        // the way to observe it.
        let _ = self.do_flush();
    }
}
