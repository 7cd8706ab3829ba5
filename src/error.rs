//! Crate-wide error type.
//!
//! Follows the source loader's habit of one `thiserror` enum with a
//! short, human-readable message per variant and `#[from]` conversions
//! for the I/O errors that most operations can fail with.

use std::io;

/// Everything that can go wrong while opening, reading, or mutating a
/// WAD container.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Header magic was neither `IWAD` nor `PWAD`.
    #[error("not a WAD file: bad magic")]
    NotAWadFile,

    /// The path given to `open`/`create_empty` does not resolve.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The OS denied read or write access to the path.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Any other I/O failure, propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A numeric field fell outside the range its caller expected.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// Caller-supplied index was negative or `>= entry_count`.
    #[error("index {index} out of bounds (entry_count = {entry_count})")]
    IndexOutOfBounds { index: i64, entry_count: usize },

    /// A lump name violated the on-disk name rules.
    #[error("invalid lump name {0:?}")]
    InvalidName(String),

    /// Operation not supported by this container variant.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// An entry's `offset + size` runs past the file's actual length.
    #[error("entry {index} ({name:?}) offset {offset}+{size} past end of file ({file_size})")]
    EntryOutOfExtent {
        index: usize,
        name: String,
        offset: u32,
        size: u32,
        file_size: usize,
    },
}

impl Error {
    /// Turn a raw I/O failure into the more specific `FileNotFound` /
    /// `PermissionDenied` variants when possible, falling back to `Io`.
    ///
    /// Mirrors the donor's practice of narrowing a generic failure to a
    /// named variant at the point it's first observed, rather than
    /// leaving every I/O hiccup as one opaque case.
    pub(crate) fn from_io_at(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(path.to_string()),
            _ => Error::Io(err),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
