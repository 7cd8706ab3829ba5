//! The 16-byte directory entry.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::Result;
use crate::name::{self, NAME_SIZE};

/// Byte size of one on-disk directory record.
pub const ENTRY_SIZE: usize = 16;

/// One directory entry: where its payload lives, how big it is, and
/// what it's called.
///
/// A value type, cheaply `Copy`able — callers are expected to hold
/// snapshots across mutations; a stale
/// snapshot's `offset`/index may no longer reflect current container
/// state, but the struct itself never points at freed memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryRecord {
    /// Byte position of the payload start within the container.
    pub offset: u32,
    /// Payload length in bytes. `0` marks this entry as a marker.
    pub size: u32,
    name_bytes: [u8; NAME_SIZE],
}

impl EntryRecord {
    /// Build an entry from an already-validated canonical name.
    pub(crate) fn new(offset: u32, size: u32, name_bytes: [u8; NAME_SIZE]) -> Self {
        EntryRecord {
            offset,
            size,
            name_bytes,
        }
    }

    /// Build a new entry, validating and encoding `name`.
    pub fn with_name(offset: u32, size: u32, logical_name: &str) -> Result<Self> {
        Ok(EntryRecord::new(offset, size, name::encode(logical_name)?))
    }

    /// Is this a marker entry (`size == 0`)?
    pub fn is_marker(&self) -> bool {
        self.size == 0
    }

    /// The canonical, NUL-padded 8-byte name.
    pub fn name_bytes(&self) -> [u8; NAME_SIZE] {
        self.name_bytes
    }

    /// The trimmed logical name.
    pub fn name(&self) -> String {
        name::decode(&self.name_bytes)
    }

    /// Read one 16-byte directory record.
    pub(crate) fn read_from<R: Read>(mut src: R) -> Result<Self> {
        let offset = src.read_u32::<LE>()?;
        let size = src.read_u32::<LE>()?;
        let mut name_bytes = [0u8; NAME_SIZE];
        src.read_exact(&mut name_bytes)?;
        Ok(EntryRecord::new(offset, size, name_bytes))
    }

    /// Write this entry's 16-byte record.
    pub(crate) fn write_to<W: Write>(&self, mut dst: W) -> io::Result<()> {
        dst.write_u32::<LE>(self.offset)?;
        dst.write_u32::<LE>(self.size)?;
        dst.write_all(&self.name_bytes)?;
        Ok(())
    }

    /// Rename in place, replacing the canonical name bytes.
    pub(crate) fn set_name_bytes(&mut self, name_bytes: [u8; NAME_SIZE]) {
        self.name_bytes = name_bytes;
    }
}
