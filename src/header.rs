//! 12-byte WAD header: magic, entry count, directory offset.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Byte size of the on-disk header.
pub const HEADER_SIZE: usize = 12;

/// `directory_offset` for a freshly created, empty archive.
pub const EMPTY_DIRECTORY_OFFSET: u32 = HEADER_SIZE as u32;

/// The two archive kinds distinguished only by their 4-byte magic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Magic {
    /// Information WAD — full base game data.
    Iwad,
    /// Patch WAD — modifications layered on top of an IWAD.
    Pwad,
}

impl Magic {
    fn from_bytes(bytes: &[u8; 4]) -> Result<Self> {
        match bytes {
            b"IWAD" => Ok(Magic::Iwad),
            b"PWAD" => Ok(Magic::Pwad),
            _ => Err(Error::NotAWadFile),
        }
    }

    fn to_bytes(self) -> [u8; 4] {
        match self {
            Magic::Iwad => *b"IWAD",
            Magic::Pwad => *b"PWAD",
        }
    }
}

/// Parsed 12-byte header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub magic: Magic,
    pub entry_count: u32,
    pub directory_offset: u32,
}

impl Header {
    /// Header for a freshly created, empty `PWAD`.
    pub fn empty() -> Self {
        Header {
            magic: Magic::Pwad,
            entry_count: 0,
            directory_offset: EMPTY_DIRECTORY_OFFSET,
        }
    }

    /// Read and validate a 12-byte header from `src`.
    ///
    /// Rejects a `directory_offset` below `HEADER_SIZE`: every entry's
    /// payload area and the directory itself live at or after byte 12,
    /// so a smaller offset can never describe a valid archive and would
    /// otherwise let callers underflow or panic when they later subtract
    /// `HEADER_SIZE` from it.
    pub fn read_from<R: Read>(mut src: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        src.read_exact(&mut magic)?;
        let magic = Magic::from_bytes(&magic)?;
        let entry_count = src.read_u32::<LE>()?;
        let directory_offset = src.read_u32::<LE>()?;
        if directory_offset < HEADER_SIZE as u32 {
            return Err(Error::OutOfRange(format!(
                "directory offset {directory_offset} precedes end of header ({HEADER_SIZE})"
            )));
        }
        Ok(Header {
            magic,
            entry_count,
            directory_offset,
        })
    }

    /// Write the 12-byte header to `dst`.
    pub fn write_to<W: Write>(&self, mut dst: W) -> io::Result<()> {
        dst.write_all(&self.magic.to_bytes())?;
        dst.write_u32::<LE>(self.entry_count)?;
        dst.write_u32::<LE>(self.directory_offset)?;
        Ok(())
    }
}
