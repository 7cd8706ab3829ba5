//! Read-only directory index built from a stream.
//!
//! Parses the header and directory once; payload I/O is explicitly
//! out of scope — the caller is expected to reopen its own source
//! using the returned entries' `offset`/`size`.

use std::io::{self, Read, Seek, SeekFrom};

use crate::container::{Container, NewEntry};
use crate::entry::{EntryRecord, ENTRY_SIZE};
use crate::error::{Error, Result};
use crate::header::{Header, Magic};
use crate::name;

/// A parsed directory with no attached payload source.
#[derive(Debug)]
pub struct DirectoryMap {
    magic: Magic,
    directory_offset: u32,
    entries: Vec<EntryRecord>,
}

impl DirectoryMap {
    /// Build a `DirectoryMap` from any sequential byte source: the
    /// content region is read and discarded rather than buffered.
    pub fn from_reader<R: Read>(mut r: R) -> Result<Self> {
        let header = Header::read_from(&mut r)?;
        let to_skip = header.directory_offset as u64 - crate::header::HEADER_SIZE as u64;
        io::copy(&mut (&mut r).take(to_skip), &mut io::sink())?;
        Self::finish(header, r)
    }

    /// Build a `DirectoryMap` from a seekable source, skipping the
    /// content region with a single seek instead of reading through
    /// it.
    pub fn from_seekable<R: Read + Seek>(mut r: R) -> Result<Self> {
        let header = Header::read_from(&mut r)?;
        r.seek(SeekFrom::Start(header.directory_offset as u64))?;
        Self::finish(header, r)
    }

    fn finish<R: Read>(header: Header, mut r: R) -> Result<Self> {
        let mut raw = vec![0u8; header.entry_count as usize * ENTRY_SIZE];
        r.read_exact(&mut raw)?;

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        let mut cursor = &raw[..];
        for _ in 0..header.entry_count {
            entries.push(EntryRecord::read_from(&mut cursor)?);
        }
        entries.retain(|e| !(name::is_blank(&e.name_bytes()) && e.size == 0));

        Ok(DirectoryMap {
            magic: header.magic,
            directory_offset: header.directory_offset,
            entries,
        })
    }
}

impl Container for DirectoryMap {
    fn magic(&self) -> Magic {
        self.magic
    }

    fn directory_offset(&self) -> u32 {
        self.directory_offset
    }

    fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    fn read_payload(&self, _entry: &EntryRecord) -> Result<Vec<u8>> {
        Err(Error::Unsupported(
            "DirectoryMap has no payload source; reopen the original stream at entry.offset",
        ))
    }

    fn open_stream<'a>(&'a self, _entry: &EntryRecord) -> Result<Box<dyn Read + 'a>> {
        Err(Error::Unsupported(
            "DirectoryMap has no payload source; reopen the original stream at entry.offset",
        ))
    }

    fn add_data_at(&mut self, _index: usize, _name: &str, _bytes: &[u8]) -> Result<EntryRecord> {
        Err(Error::Unsupported("DirectoryMap is read-only"))
    }

    fn add_marker_at(&mut self, _index: usize, _name: &str) -> Result<EntryRecord> {
        Err(Error::Unsupported("DirectoryMap is read-only"))
    }

    fn rename(&mut self, _index: usize, _new_name: &str) -> Result<()> {
        Err(Error::Unsupported("DirectoryMap is read-only"))
    }

    fn replace(&mut self, _index: usize, _bytes: &[u8]) -> Result<EntryRecord> {
        Err(Error::Unsupported("DirectoryMap is read-only"))
    }

    fn remove(&mut self, _index: usize) -> Result<EntryRecord> {
        Err(Error::Unsupported("DirectoryMap is read-only"))
    }

    fn delete(&mut self, _index: usize) -> Result<EntryRecord> {
        Err(Error::Unsupported("DirectoryMap is read-only"))
    }

    fn set_entries(&mut self, _entries: &[NewEntry<'_>]) -> Result<Vec<EntryRecord>> {
        Err(Error::Unsupported("DirectoryMap is read-only"))
    }

    fn splice(&mut self, _start: usize, _entries: &[NewEntry<'_>]) -> Result<Vec<EntryRecord>> {
        Err(Error::Unsupported("DirectoryMap is read-only"))
    }
}
