//! The abstract contract every WAD container realization satisfies.

use std::io::Read;

use crate::entry::EntryRecord;
use crate::error::{Error, Result};
use crate::header::Magic;

/// One element of a bulk directory rewrite: either a marker or a named
/// payload, used by [`Container::set_entries`] and [`Container::splice`].
#[derive(Clone, Copy, Debug)]
pub enum NewEntry<'a> {
    /// A zero-size marker entry.
    Marker { name: &'a str },
    /// A named payload to be written into the content region.
    Data { name: &'a str, bytes: &'a [u8] },
}

/// Abstract contract satisfied by [`crate::FileContainer`],
/// [`crate::BufferContainer`], and [`crate::DirectoryMap`].
///
/// Read-side enumeration and search are provided as default methods on
/// top of [`Container::entries`]; every concrete type need only supply
/// the handful of methods that differ by storage strategy. Mutating
/// methods return [`Error::Unsupported`] on containers that can't
/// support them (`DirectoryMap`) rather than silently no-opping.
pub trait Container {
    /// The archive kind (`IWAD`/`PWAD`).
    fn magic(&self) -> Magic;

    /// Current directory offset: `[12, directory_offset)` is the
    /// payload area, `[directory_offset, ..)` is the directory.
    fn directory_offset(&self) -> u32;

    /// The directory, in on-disk order. Duplicates are permitted and
    /// meaningful: marker entries such as `F_START`/`F_END` repeat by design.
    fn entries(&self) -> &[EntryRecord];

    /// Number of entries in the directory.
    fn entry_count(&self) -> usize {
        self.entries().len()
    }

    /// Entry at `i`. Panics if `i >= entry_count()`.
    fn get(&self, i: usize) -> EntryRecord {
        self.entries()[i]
    }

    /// Iterate entries in directory order.
    fn iter(&self) -> std::slice::Iter<'_, EntryRecord> {
        self.entries().iter()
    }

    /// First entry named `name` at or after `start` (bounds-checked).
    fn find_first_from(&self, name: &str, start: usize) -> Option<(usize, EntryRecord)> {
        if start >= self.entry_count() {
            return None;
        }
        self.entries()[start..]
            .iter()
            .position(|e| e.name() == name)
            .map(|rel| (rel + start, self.entries()[rel + start]))
    }

    /// First entry named `name`.
    fn find_first(&self, name: &str) -> Option<(usize, EntryRecord)> {
        self.find_first_from(name, 0)
    }

    /// The `n`-th (zero-indexed) entry named `name`, scanning from the
    /// start.
    fn find_nth(&self, name: &str, n: usize) -> Option<(usize, EntryRecord)> {
        self.entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name() == name)
            .nth(n)
            .map(|(i, e)| (i, *e))
    }

    /// The last entry named `name`.
    ///
    /// Scans forward from index 0 retaining the last match rather than
    /// scanning in reverse, matching WAD load-order semantics where the
    /// *last* occurrence of a resource conventionally wins.
    fn find_last(&self, name: &str) -> Option<(usize, EntryRecord)> {
        let mut found = None;
        for (i, e) in self.entries().iter().enumerate() {
            if e.name() == name {
                found = Some((i, *e));
            }
        }
        found
    }

    /// All directory indices named `name`, in order.
    fn indices_of(&self, name: &str) -> Vec<usize> {
        self.entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name() == name)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the last entry named `name`, or `-1` if absent.
    fn last_index_of(&self, name: &str) -> i32 {
        match self.find_last(name) {
            Some((i, _)) => i as i32,
            None => -1,
        }
    }

    /// A clipped window of the directory: `entries[start .. min(start +
    /// max_len, entry_count)]`. Never errors on overshoot; errors if
    /// `start < 0`.
    fn map_entries(&self, start: i64, max_len: usize) -> Result<Vec<EntryRecord>> {
        if start < 0 {
            return Err(Error::OutOfRange(format!(
                "map_entries start {start} is negative"
            )));
        }
        let start = start as usize;
        let count = self.entry_count();
        if start >= count {
            return Ok(Vec::new());
        }
        let end = count.min(start + max_len);
        Ok(self.entries()[start..end].to_vec())
    }

    /// Read an entry's payload bytes.
    fn read_payload(&self, entry: &EntryRecord) -> Result<Vec<u8>>;

    /// Read the payload of the entry at directory index `i`.
    fn read_payload_by_index(&self, i: usize) -> Result<Vec<u8>> {
        if i >= self.entry_count() {
            return Err(Error::IndexOutOfBounds {
                index: i as i64,
                entry_count: self.entry_count(),
            });
        }
        self.read_payload(&self.get(i))
    }

    /// Read the payload of the first entry named `name`.
    fn read_payload_by_name(&self, name: &str) -> Result<Vec<u8>> {
        let (_, entry) = self
            .find_first(name)
            .ok_or_else(|| Error::InvalidName(name.to_string()))?;
        self.read_payload(&entry)
    }

    /// Open a byte source delivering exactly `entry.size` bytes
    /// starting at `entry.offset`. Independent of the container's
    /// lifetime guarantees beyond what each implementation documents.
    fn open_stream<'a>(&'a self, entry: &EntryRecord) -> Result<Box<dyn Read + 'a>>;

    /// Append a new data entry at the end of the directory.
    fn add_data(&mut self, name: &str, bytes: &[u8]) -> Result<EntryRecord> {
        let at = self.entry_count();
        self.add_data_at(at, name, bytes)
    }

    /// Insert a new data entry at directory index `index`.
    fn add_data_at(&mut self, index: usize, name: &str, bytes: &[u8]) -> Result<EntryRecord>;

    /// Append a new marker entry at the end of the directory.
    fn add_marker(&mut self, name: &str) -> Result<EntryRecord> {
        let at = self.entry_count();
        self.add_marker_at(at, name)
    }

    /// Insert a new marker entry at directory index `index`.
    fn add_marker_at(&mut self, index: usize, name: &str) -> Result<EntryRecord>;

    /// Rename the entry at `index` in place.
    fn rename(&mut self, index: usize, new_name: &str) -> Result<()>;

    /// Replace the payload of the entry at `index`.
    fn replace(&mut self, index: usize, bytes: &[u8]) -> Result<EntryRecord>;

    /// Remove the entry at `index` from the directory only; its
    /// payload bytes are orphaned in the content region.
    fn remove(&mut self, index: usize) -> Result<EntryRecord>;

    /// Remove the entry at `index` and reclaim its payload bytes by
    /// shifting trailing content down.
    fn delete(&mut self, index: usize) -> Result<EntryRecord>;

    /// Replace the entire directory with `entries`, writing their
    /// payloads (if any) into a fresh content region.
    fn set_entries(&mut self, entries: &[NewEntry<'_>]) -> Result<Vec<EntryRecord>>;

    /// Overwrite (or append past the end) the directory starting at
    /// `start` with `entries`.
    fn splice(&mut self, start: usize, entries: &[NewEntry<'_>]) -> Result<Vec<EntryRecord>>;

    /// Release any OS resources this container owns. Idempotent.
    fn close(self)
    where
        Self: Sized,
    {
    }
}
