//! Random-access, file-backed WAD container with in-place mutation.

use byteorder::{LittleEndian as LE, ReadBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::container::{Container, NewEntry};
use crate::entry::{EntryRecord, ENTRY_SIZE};
use crate::error::{Error, Result};
use crate::header::{Header, Magic, HEADER_SIZE};
use crate::name;

/// Size of the fixed copy buffer used to slide the content region down
/// during [`FileContainer::delete`].
const SHIFT_BUFFER_SIZE: usize = 64 * 1024;

/// An open, random-access, file-backed WAD archive.
///
/// Exclusively owns its file handle for its lifetime; two
/// `FileContainer`s (or threads) must never mutate the same path at
/// once.
#[derive(Debug)]
pub struct FileContainer {
    file: File,
    path: PathBuf,
    magic: Magic,
    directory_offset: u32,
    entries: Vec<EntryRecord>,
}

impl FileContainer {
    /// Open an existing WAD file with read+write access, parsing its
    /// header and directory eagerly.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.display().to_string();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::from_io_at(e, &path_str))?;

        file.seek(SeekFrom::Start(0))?;
        let header = Header::read_from(&mut file)?;

        let file_len = file.metadata()?.len();
        let dir_end = header.directory_offset as u64 + header.entry_count as u64 * ENTRY_SIZE as u64;
        if dir_end > file_len {
            return Err(Error::OutOfRange(format!(
                "directory end {dir_end} past end of file ({file_len})"
            )));
        }

        file.seek(SeekFrom::Start(header.directory_offset as u64))?;
        let mut raw = vec![0u8; header.entry_count as usize * ENTRY_SIZE];
        file.read_exact(&mut raw)?;

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        let mut cursor = &raw[..];
        for _ in 0..header.entry_count {
            entries.push(EntryRecord::read_from(&mut cursor)?);
        }
        entries.retain(|e| !(name::is_blank(&e.name_bytes()) && e.size == 0));

        for (i, e) in entries.iter().enumerate() {
            let end = e.offset as u64 + e.size as u64;
            if e.size > 0 && end > file_len {
                return Err(Error::EntryOutOfExtent {
                    index: i,
                    name: e.name(),
                    offset: e.offset,
                    size: e.size,
                    file_size: file_len as usize,
                });
            }
        }

        Ok(FileContainer {
            file,
            path,
            magic: header.magic,
            directory_offset: header.directory_offset,
            entries,
        })
    }

    /// Create a fresh, empty `PWAD` at `path`, overwriting any existing
    /// file.
    pub fn create_empty<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.display().to_string();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::from_io_at(e, &path_str))?;

        let header = Header::empty();
        file.seek(SeekFrom::Start(0))?;
        header.write_to(&mut file)?;
        file.set_len(HEADER_SIZE as u64)?;

        Ok(FileContainer {
            file,
            path,
            magic: header.magic,
            directory_offset: header.directory_offset,
            entries: Vec::new(),
        })
    }

    /// The path this container was opened/created from.
    pub fn path(&self) -> &Path {
        &self.path
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

    /// Rewrite `entry_count` + `directory_offset` in the header, then
    /// the whole directory, then truncate away any trailing garbage
    /// from a previously larger directory.
    pub(crate) fn flush_directory(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(4))?;
        self.file.write_u32::<LE>(self.entries.len() as u32)?;
        self.file.write_u32::<LE>(self.directory_offset)?;

        self.file
            .seek(SeekFrom::Start(self.directory_offset as u64))?;
        for e in &self.entries {
            e.write_to(&mut self.file)?;
        }
        let end = self.file.stream_position()?;
        self.file.set_len(end)?;
        Ok(())
    }

    /// Write `bytes` at the current directory offset, advance it, and
    /// insert the new entry — without flushing the directory. Shared
    /// by the public `add_data_at`, [`crate::BulkAdder`], and the
    /// full-replacement operations.
    pub(crate) fn add_data_at_raw(
        &mut self,
        index: usize,
        logical_name: &str,
        bytes: &[u8],
    ) -> Result<EntryRecord> {
        if index > self.entries.len() {
            return Err(Error::IndexOutOfBounds {
                index: index as i64,
                entry_count: self.entries.len(),
            });
        }
        let name_bytes = name::encode(logical_name)?;

        self.file
            .seek(SeekFrom::Start(self.directory_offset as u64))?;
        self.file.write_all(bytes)?;

        let entry = EntryRecord::new(self.directory_offset, bytes.len() as u32, name_bytes);
        self.directory_offset = self
            .directory_offset
            .checked_add(bytes.len() as u32)
            .ok_or_else(|| Error::OutOfRange("directory offset overflowed u32".to_string()))?;
        self.entries.insert(index, entry);
        Ok(entry)
    }

    /// Insert a marker entry without flushing the directory.
    pub(crate) fn add_marker_at_raw(&mut self, index: usize, logical_name: &str) -> Result<EntryRecord> {
        if index > self.entries.len() {
            return Err(Error::IndexOutOfBounds {
                index: index as i64,
                entry_count: self.entries.len(),
            });
        }
        let name_bytes = name::encode(logical_name)?;
        let entry = EntryRecord::new(self.directory_offset, 0, name_bytes);
        self.entries.insert(index, entry);
        Ok(entry)
    }

    /// Remove the entry at `index` and slide trailing content down by
    /// its size, without flushing the directory.
    pub(crate) fn delete_raw(&mut self, index: usize) -> Result<EntryRecord> {
        self.require_index(index)?;
        let removed = self.entries.remove(index);

        if removed.size > 0 {
            self.shift_content_down(removed.offset, removed.size)?;
            self.directory_offset -= removed.size;
            for e in self.entries.iter_mut() {
                if e.offset > removed.offset {
                    e.offset -= removed.size;
                }
            }
        }
        Ok(removed)
    }

    /// Slide the bytes in `[hole_start + hole_size, old_directory_offset)`
    /// down to start at `hole_start`, using a fixed-size copy buffer.
    /// The source position only ever increases, so forward, in-order
    /// chunked copies are safe even though source and destination
    /// ranges overlap.
    fn shift_content_down(&mut self, hole_start: u32, hole_size: u32) -> Result<()> {
        let old_end = self.directory_offset as u64;
        let mut src = hole_start as u64 + hole_size as u64;
        let mut dst = hole_start as u64;
        let mut buf = vec![0u8; SHIFT_BUFFER_SIZE.min((old_end - src).max(1) as usize)];

        while src < old_end {
            let chunk = (old_end - src).min(buf.len() as u64) as usize;
            self.file.seek(SeekFrom::Start(src))?;
            self.file.read_exact(&mut buf[..chunk])?;
            self.file.seek(SeekFrom::Start(dst))?;
            self.file.write_all(&buf[..chunk])?;
            src += chunk as u64;
            dst += chunk as u64;
        }
        Ok(())
    }
}

impl Container for FileContainer {
    fn magic(&self) -> Magic {
        self.magic
    }

    fn directory_offset(&self) -> u32 {
        self.directory_offset
    }

    fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    fn read_payload(&self, entry: &EntryRecord) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; entry.size as usize];
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(entry.offset as u64))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn open_stream<'a>(&'a self, entry: &EntryRecord) -> Result<Box<dyn Read + 'a>> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(entry.offset as u64))?;
        Ok(Box::new(file.take(entry.size as u64)))
    }

    fn add_data_at(&mut self, index: usize, name: &str, bytes: &[u8]) -> Result<EntryRecord> {
        let entry = self.add_data_at_raw(index, name, bytes)?;
        self.flush_directory()?;
        Ok(entry)
    }

    fn add_marker_at(&mut self, index: usize, name: &str) -> Result<EntryRecord> {
        let entry = self.add_marker_at_raw(index, name)?;
        self.flush_directory()?;
        Ok(entry)
    }

    fn rename(&mut self, index: usize, new_name: &str) -> Result<()> {
        self.require_index(index)?;
        let name_bytes = name::encode(new_name)?;
        self.entries[index].set_name_bytes(name_bytes);

        let name_field = self.directory_offset as u64 + (index * ENTRY_SIZE) as u64 + 8;
        self.file.seek(SeekFrom::Start(name_field))?;
        self.file.write_all(&name_bytes)?;
        Ok(())
    }

    fn replace(&mut self, index: usize, bytes: &[u8]) -> Result<EntryRecord> {
        self.require_index(index)?;
        let entry = self.entries[index];
        if bytes.len() as u32 == entry.size {
            self.file.seek(SeekFrom::Start(entry.offset as u64))?;
            self.file.write_all(bytes)?;
            Ok(entry)
        } else {
            let logical_name = entry.name();
            self.delete(index)?;
            self.add_data_at(index, &logical_name, bytes)
        }
    }

    fn remove(&mut self, index: usize) -> Result<EntryRecord> {
        self.require_index(index)?;
        let entry = self.entries.remove(index);
        self.flush_directory()?;
        Ok(entry)
    }

    fn delete(&mut self, index: usize) -> Result<EntryRecord> {
        let entry = self.delete_raw(index)?;
        self.flush_directory()?;
        Ok(entry)
    }

    fn set_entries(&mut self, entries: &[NewEntry<'_>]) -> Result<Vec<EntryRecord>> {
        self.entries.clear();
        self.directory_offset = HEADER_SIZE as u32;
        let mut out = Vec::with_capacity(entries.len());
        for ne in entries {
            out.push(match *ne {
                NewEntry::Marker { name } => self.add_marker_at_raw(out.len(), name)?,
                NewEntry::Data { name, bytes } => self.add_data_at_raw(out.len(), name, bytes)?,
            });
        }
        self.flush_directory()?;
        Ok(out)
    }

    fn splice(&mut self, start: usize, entries: &[NewEntry<'_>]) -> Result<Vec<EntryRecord>> {
        let mut out = Vec::with_capacity(entries.len());
        for (i, ne) in entries.iter().enumerate() {
            let idx = start + i;
            if idx < self.entry_count() {
                self.delete_raw(idx)?;
                out.push(match *ne {
                    NewEntry::Marker { name } => self.add_marker_at_raw(idx, name)?,
                    NewEntry::Data { name, bytes } => self.add_data_at_raw(idx, name, bytes)?,
                });
            } else {
                out.push(match *ne {
                    NewEntry::Marker { name } => self.add_marker_at_raw(idx, name)?,
                    NewEntry::Data { name, bytes } => self.add_data_at_raw(idx, name, bytes)?,
                });
            }
        }
        self.flush_directory()?;
        Ok(out)
    }

    fn close(self) {
        drop(self);
    }
}

impl Drop for FileContainer {
    fn drop(&mut self) {
        // Best-effort only: a container left in an inconsistent
        // in-memory state after a failed mutation is not expected to
        // self-heal on drop. Every successful mutation already
        // flushed, so there is nothing to do here.
        let _ = self.file.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn empty_path() -> PathBuf {
        NamedTempFile::new().unwrap().into_temp_path().keep().unwrap()
    }

    #[test]
    fn create_and_add_round_trips_on_disk() {
        let path = empty_path();
        {
            let mut c = FileContainer::create_empty(&path).unwrap();
            c.add_data("LUMP01", &[0xAA, 0xBB, 0xCC]).unwrap();
        }

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"PWAD");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 15);
        assert_eq!(&bytes[12..15], &[0xAA, 0xBB, 0xCC]);
        assert_eq!(
            &bytes[15..31],
            &[12, 0, 0, 0, 3, 0, 0, 0, b'L', b'U', b'M', b'P', b'0', b'1', 0, 0]
        );

        let reopened = FileContainer::open(&path).unwrap();
        assert_eq!(reopened.entry_count(), 1);
        assert_eq!(reopened.get(0).name(), "LUMP01");
        assert_eq!(reopened.get(0).size, 3);
        assert_eq!(reopened.get(0).offset, 12);
        assert_eq!(reopened.directory_offset(), 15);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn delete_slides_trailing_payload_down() {
        let path = empty_path();
        let mut c = FileContainer::create_empty(&path).unwrap();
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
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn delete_then_add_at_same_index_matches_new_bytes() {
        let path = empty_path();
        let mut c = FileContainer::create_empty(&path).unwrap();
        c.add_data("A", &[1, 2]).unwrap();
        c.add_data("B", &[3, 4]).unwrap();

        c.delete(0).unwrap();
        c.add_data_at(0, "A", &[9, 9, 9]).unwrap();

        assert_eq!(c.read_payload_by_index(0).unwrap(), vec![9, 9, 9]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn replace_larger_payload_moves_entry() {
        let path = empty_path();
        let mut c = FileContainer::create_empty(&path).unwrap();
        c.add_data("A", &[0u8; 10]).unwrap();
        let replaced = c.replace(0, &[7u8; 15]).unwrap();
        assert_eq!(replaced.size, 15);
        assert_eq!(c.read_payload_by_index(0).unwrap(), vec![7u8; 15]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rename_does_not_touch_payload() {
        let path = empty_path();
        let mut c = FileContainer::create_empty(&path).unwrap();
        c.add_data("OLD", &[1, 2, 3]).unwrap();
        c.rename(0, "new").unwrap();
        assert_eq!(c.get(0).name(), "NEW");
        assert_eq!(c.read_payload_by_index(0).unwrap(), vec![1, 2, 3]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn remove_leaves_a_hole_without_sliding() {
        let path = empty_path();
        let mut c = FileContainer::create_empty(&path).unwrap();
        c.add_data("A", &[1, 2, 3, 4]).unwrap();
        c.add_data("B", &[5, 6, 7, 8]).unwrap();
        let before_dir_offset = c.directory_offset();

        c.remove(0).unwrap();

        assert_eq!(c.entry_count(), 1);
        assert_eq!(c.get(0).name(), "B");
        assert_eq!(c.get(0).offset, 16);
        assert_eq!(c.directory_offset(), before_dir_offset);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_bad_magic_file() {
        let path = empty_path();
        std::fs::write(&path, b"NOPE\0\0\0\0\0\0\0\0").unwrap();
        let err = FileContainer::open(&path).unwrap_err();
        assert!(matches!(err, Error::NotAWadFile));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_directory_past_eof() {
        let path = empty_path();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"IWAD");
        bytes.extend(&1u32.to_le_bytes());
        bytes.extend(&12u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = FileContainer::open(&path).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_directory_offset_before_header_end() {
        let path = empty_path();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"PWAD");
        bytes.extend(&0u32.to_le_bytes());
        bytes.extend(&0u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = FileContainer::open(&path).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn set_entries_replaces_whole_directory() {
        let path = empty_path();
        let mut c = FileContainer::create_empty(&path).unwrap();
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

        let reopened = FileContainer::open(&path).unwrap();
        assert_eq!(reopened.entry_count(), 2);
        assert_eq!(reopened.get(0).name(), "NEW1");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn splice_overwrites_entries_in_place() {
        let path = empty_path();
        let mut c = FileContainer::create_empty(&path).unwrap();
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
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn splice_appends_past_the_end() {
        let path = empty_path();
        let mut c = FileContainer::create_empty(&path).unwrap();
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
        let _ = std::fs::remove_file(&path);
    }
}
