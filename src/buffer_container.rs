//! In-memory, growable-buffer WAD container.
//!
//! Same contract as [`crate::FileContainer`] but every mutation is a
//! plain `Vec<u8>` splice — there's no I/O until the caller asks for
//! one via [`BufferContainer::flush_to_file`] or
//! [`BufferContainer::flush_to_stream`].

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::container::{Container, NewEntry};
use crate::entry::EntryRecord;
use crate::error::{Error, Result};
use crate::header::{Header, Magic, HEADER_SIZE};
use crate::name;

/// WAD archive held entirely in memory.
#[derive(Debug)]
pub struct BufferContainer {
    magic: Magic,
    entries: Vec<EntryRecord>,
    /// Payload bytes only: `content[i]` is the byte at absolute file
    /// offset `HEADER_SIZE + i`. `directory_offset` is always derived
    /// as `HEADER_SIZE + content.len()`.
    content: Vec<u8>,
}

impl BufferContainer {
    /// A fresh, empty `PWAD` buffer.
    pub fn create_empty() -> Self {
        BufferContainer {
            magic: Magic::Pwad,
            entries: Vec::new(),
            content: Vec::new(),
        }
    }

    /// Mount an archive already read into memory by the caller.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let header = Header::read_from(&bytes[..])?;
        let dir_end =
            header.directory_offset as usize + header.entry_count as usize * crate::entry::ENTRY_SIZE;
        if dir_end > bytes.len() {
            return Err(Error::OutOfRange(format!(
                "directory end {dir_end} past buffer length {}",
                bytes.len()
            )));
        }

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        let mut cursor = &bytes[header.directory_offset as usize..dir_end];
        for _ in 0..header.entry_count {
            entries.push(EntryRecord::read_from(&mut cursor)?);
        }
        entries.retain(|e| !(name::is_blank(&e.name_bytes()) && e.size == 0));

        for (i, e) in entries.iter().enumerate() {
            let end = e.offset as usize + e.size as usize;
            if e.size > 0 && end > bytes.len() {
                return Err(Error::EntryOutOfExtent {
                    index: i,
                    name: e.name(),
                    offset: e.offset,
                    size: e.size,
                    file_size: bytes.len(),
                });
            }
        }

        let content = bytes[HEADER_SIZE..header.directory_offset as usize].to_vec();
        Ok(BufferContainer {
            magic: header.magic,
            entries,
            content,
        })
    }

    /// Read a whole file into a buffer-backed container.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let bytes = std::fs::read(&path).map_err(|e| Error::from_io_at(e, &path_str))?;
        Self::from_bytes(bytes)
    }

    /// Serialize header + content + directory into one `Vec<u8>`.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.content.len() + self.directory_bytes_len());
        self.flush_to_stream(&mut out).expect("writing to a Vec cannot fail");
        out
    }

    /// Write header + content + directory to `path`, overwriting it.
    pub fn flush_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_str = path.as_ref().display().to_string();
        let file = File::create(&path).map_err(|e| Error::from_io_at(e, &path_str))?;
        let mut writer = io::BufWriter::new(file);
        self.flush_to_stream(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write header + content + directory to any `Write` sink.
    pub fn flush_to_stream<W: Write>(&self, mut w: W) -> Result<()> {
        self.header().write_to(&mut w)?;
        w.write_all(&self.content)?;
        for e in &self.entries {
            e.write_to(&mut w)?;
        }
        Ok(())
    }

    fn header(&self) -> Header {
        Header {
            magic: self.magic,
            entry_count: self.entries.len() as u32,
            directory_offset: self.directory_offset(),
        }
    }

    fn directory_bytes_len(&self) -> usize {
        self.entries.len() * crate::entry::ENTRY_SIZE
    }

    fn content_range(&self, entry: &EntryRecord) -> Result<std::ops::Range<usize>> {
        let start = entry.offset.checked_sub(HEADER_SIZE as u32).ok_or_else(|| {
            Error::OutOfRange(format!("entry offset {} precedes content region", entry.offset))
        })? as usize;
        let end = start + entry.size as usize;
        if end > self.content.len() {
            let index = self.entries.iter().position(|e| e == entry).unwrap_or(0);
            return Err(Error::EntryOutOfExtent {
                index,
                name: entry.name(),
                offset: entry.offset,
                size: entry.size,
                file_size: HEADER_SIZE + self.content.len(),
            });
        }
        Ok(start..end)
    }

    fn require_index(&self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(Error::IndexOutOfBounds {
                index: index as i64,
                entry_count: self.entries.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn add_data_at_raw(
        &mut self,
        index: usize,
        name: &str,
        bytes: &[u8],
    ) -> Result<EntryRecord> {
        if index > self.entries.len() {
            return Err(Error::IndexOutOfBounds {
                index: index as i64,
                entry_count: self.entries.len(),
            });
        }
        let name_bytes = name::encode(name)?;
        let offset = self.directory_offset();
        self.content.extend_from_slice(bytes);
        let entry = EntryRecord::new(offset, bytes.len() as u32, name_bytes);
        self.entries.insert(index, entry);
        Ok(entry)
    }

    pub(crate) fn add_marker_at_raw(&mut self, index: usize, name: &str) -> Result<EntryRecord> {
        if index > self.entries.len() {
            return Err(Error::IndexOutOfBounds {
                index: index as i64,
                entry_count: self.entries.len(),
            });
        }
        let name_bytes = name::encode(name)?;
        let entry = EntryRecord::new(self.directory_offset(), 0, name_bytes);
        self.entries.insert(index, entry);
        Ok(entry)
    }
}

impl Container for BufferContainer {
    fn magic(&self) -> Magic {
        self.magic
    }

    fn directory_offset(&self) -> u32 {
        HEADER_SIZE as u32 + self.content.len() as u32
    }

    fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    fn read_payload(&self, entry: &EntryRecord) -> Result<Vec<u8>> {
        let range = self.content_range(entry)?;
        Ok(self.content[range].to_vec())
    }

    fn open_stream<'a>(&'a self, entry: &EntryRecord) -> Result<Box<dyn Read + 'a>> {
        let range = self.content_range(entry)?;
        Ok(Box::new(&self.content[range]))
    }

    fn add_data_at(&mut self, index: usize, name: &str, bytes: &[u8]) -> Result<EntryRecord> {
        self.add_data_at_raw(index, name, bytes)
    }

    fn add_marker_at(&mut self, index: usize, name: &str) -> Result<EntryRecord> {
        self.add_marker_at_raw(index, name)
    }

    fn rename(&mut self, index: usize, new_name: &str) -> Result<()> {
        self.require_index(index)?;
        let name_bytes = name::encode(new_name)?;
        self.entries[index].set_name_bytes(name_bytes);
        Ok(())
    }

    fn replace(&mut self, index: usize, bytes: &[u8]) -> Result<EntryRecord> {
        self.require_index(index)?;
        let entry = self.entries[index];
        if bytes.len() as u32 == entry.size {
            let range = self.content_range(&entry)?;
            self.content[range].copy_from_slice(bytes);
            Ok(entry)
        } else {
            let name = entry.name();
            self.delete(index)?;
            self.add_data_at(index, &name, bytes)
        }
    }

    fn remove(&mut self, index: usize) -> Result<EntryRecord> {
        self.require_index(index)?;
        Ok(self.entries.remove(index))
    }

    fn delete(&mut self, index: usize) -> Result<EntryRecord> {
        self.require_index(index)?;
        let entry = self.entries.remove(index);
        if entry.size > 0 {
            let range = self.content_range(&entry)?;
            self.content.drain(range);
            for e in self.entries.iter_mut() {
                if e.offset > entry.offset {
                    e.offset -= entry.size;
                }
            }
        }
        Ok(entry)
    }

    fn set_entries(&mut self, entries: &[NewEntry<'_>]) -> Result<Vec<EntryRecord>> {
        self.entries.clear();
        self.content.clear();
        let mut out = Vec::with_capacity(entries.len());
        for ne in entries {
            out.push(match *ne {
                NewEntry::Marker { name } => self.add_marker(name)?,
                NewEntry::Data { name, bytes } => self.add_data(name, bytes)?,
            });
        }
        Ok(out)
    }

    fn splice(&mut self, start: usize, entries: &[NewEntry<'_>]) -> Result<Vec<EntryRecord>> {
        let mut out = Vec::with_capacity(entries.len());
        for (i, ne) in entries.iter().enumerate() {
            let idx = start + i;
            if idx < self.entry_count() {
                self.delete(idx)?;
                out.push(match *ne {
                    NewEntry::Marker { name } => self.add_marker_at(idx, name)?,
                    NewEntry::Data { name, bytes } => self.add_data_at(idx, name, bytes)?,
                });
            } else {
                out.push(match *ne {
                    NewEntry::Marker { name } => self.add_marker(name)?,
                    NewEntry::Data { name, bytes } => self.add_data(name, bytes)?,
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_add() {
        let mut c = BufferContainer::create_empty();
        let e = c.add_data("LUMP01", &[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(e.offset, 12);
        assert_eq!(e.size, 3);
        assert_eq!(c.directory_offset(), 15);

        let bytes = c.into_bytes();
        assert_eq!(&bytes[0..4], b"PWAD");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 15);
        assert_eq!(&bytes[12..15], &[0xAA, 0xBB, 0xCC]);
        assert_eq!(
            &bytes[15..31],
            &[12, 0, 0, 0, 3, 0, 0, 0, b'L', b'U', b'M', b'P', b'0', b'1', 0, 0]
        );
    }

    #[test]
    fn delete_shifts_trailing_payload() {
        let mut c = BufferContainer::create_empty();
        c.add_data("A", &[1, 2, 3, 4]).unwrap();
        c.add_data("B", &[5, 6, 7, 8]).unwrap();
        c.add_data("C", &[9, 10, 11, 12]).unwrap();

        c.delete(0).unwrap();

        assert_eq!(c.entry_count(), 2);
        assert_eq!(c.get(0).name(), "B");
        assert_eq!(c.get(0).offset, 12);
        assert_eq!(c.get(1).name(), "C");
        assert_eq!(c.get(1).offset, 16);
        assert_eq!(c.directory_offset(), 20);
        assert_eq!(c.read_payload_by_index(0).unwrap(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn replace_same_size_keeps_offset() {
        let mut c = BufferContainer::create_empty();
        let orig = c.add_data("LUMP", &[1, 2, 3, 4]).unwrap();
        let replaced = c.replace(0, &[9, 8, 7, 6]).unwrap();
        assert_eq!(replaced.offset, orig.offset);
        assert_eq!(c.read_payload_by_index(0).unwrap(), vec![9, 8, 7, 6]);
    }

    #[test]
    fn replace_different_size_reassigns_offset() {
        let mut c = BufferContainer::create_empty();
        c.add_data("A", &[0; 10]).unwrap();
        let replaced = c.replace(0, &[1; 15]).unwrap();
        assert_eq!(replaced.size, 15);
        assert_eq!(c.read_payload_by_index(0).unwrap(), vec![1; 15]);
        assert_eq!(c.get(0).name(), "A");
    }

    #[test]
    fn find_last_wins_over_duplicates() {
        let mut c = BufferContainer::create_empty();
        c.add_data("DUP", &[1]).unwrap();
        c.add_data("DUP", &[2]).unwrap();
        let (idx, _) = c.find_last("DUP").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(c.last_index_of("DUP"), 1);
        assert_eq!(c.last_index_of("NOPE"), -1);
    }

    #[test]
    fn map_entries_clips_and_rejects_negative() {
        let mut c = BufferContainer::create_empty();
        for n in ["A", "B", "C"] {
            c.add_data(n, &[0]).unwrap();
        }
        assert_eq!(c.map_entries(1, 10).unwrap().len(), 2);
        assert_eq!(c.map_entries(5, 10).unwrap().len(), 0);
        assert!(c.map_entries(-1, 10).is_err());
    }

    #[test]
    fn from_bytes_drops_blank_trailing_record() {
        let mut c = BufferContainer::create_empty();
        c.add_data("LUMP", &[1, 2]).unwrap();
        let mut bytes = c.into_bytes();

        // Append one all-zero directory record and bump entry_count.
        bytes.extend(std::iter::repeat(0u8).take(crate::entry::ENTRY_SIZE));
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());

        let reloaded = BufferContainer::from_bytes(bytes).unwrap();
        assert_eq!(reloaded.entry_count(), 1);
    }

    #[test]
    fn from_bytes_rejects_directory_offset_before_header_end() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"PWAD");
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        let err = BufferContainer::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
    }

    #[test]
    fn set_entries_replaces_whole_directory() {
        let mut c = BufferContainer::create_empty();
        c.add_data("OLD", &[1, 2, 3]).unwrap();

        let out = c
            .set_entries(&[
                NewEntry::Data {
                    name: "NEW1",
                    bytes: &[9, 9],
                },
                NewEntry::Marker { name: "MARK" },
            ])
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(c.entry_count(), 2);
        assert_eq!(c.get(0).name(), "NEW1");
        assert_eq!(c.read_payload_by_index(0).unwrap(), vec![9, 9]);
        assert_eq!(c.get(1).name(), "MARK");
        assert!(c.get(1).is_marker());
    }

    #[test]
    fn splice_overwrites_entries_in_place() {
        let mut c = BufferContainer::create_empty();
        c.add_data("A", &[1]).unwrap();
        c.add_data("B", &[2]).unwrap();
        c.add_data("C", &[3]).unwrap();

        let out = c
            .splice(
                1,
                &[NewEntry::Data {
                    name: "REPL",
                    bytes: &[7, 7, 7],
                }],
            )
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(c.entry_count(), 3);
        assert_eq!(c.get(0).name(), "A");
        assert_eq!(c.get(1).name(), "REPL");
        assert_eq!(c.read_payload_by_index(1).unwrap(), vec![7, 7, 7]);
        assert_eq!(c.get(2).name(), "C");
    }

    #[test]
    fn splice_appends_past_the_end() {
        let mut c = BufferContainer::create_empty();
        c.add_data("A", &[1]).unwrap();

        let out = c
            .splice(
                5,
                &[NewEntry::Data {
                    name: "TAIL",
                    bytes: &[8, 8],
                }],
            )
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(c.entry_count(), 2);
        assert_eq!(c.get(1).name(), "TAIL");
        assert_eq!(c.read_payload_by_index(1).unwrap(), vec![8, 8]);
    }
}
