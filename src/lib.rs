//! A library for reading, editing, and creating Doom-family WAD
//! archives: a 12-byte header, a packed content region of variable-size
//! payloads, and a trailing directory of fixed-width entry records.
//!
//! Three realizations share the [`Container`] trait:
//!
//! - [`FileContainer`] mutates a file on disk in place with random access.
//! - [`BufferContainer`] mutates an in-memory buffer, flushed on demand.
//! - [`DirectoryMap`] indexes a directory from a stream; read-only, and
//!   defers payload reads to the caller.
//!
//! [`BulkAdder`] batches many appends against a [`FileContainer`] or
//! [`BufferContainer`] into a single directory flush.

pub mod bulk_adder;
pub mod buffer_container;
pub mod container;
pub mod directory_map;
pub mod entry;
pub mod error;
pub mod file_container;
pub mod header;
pub mod name;

pub use bulk_adder::{BulkAdder, BulkMutable};
pub use buffer_container::BufferContainer;
pub use container::{Container, NewEntry};
pub use directory_map::DirectoryMap;
pub use entry::EntryRecord;
pub use error::{Error, Result};
pub use file_container::FileContainer;
pub use header::{Header, Magic};

use std::path::Path;

/// Create a new WAD at `target` containing copies of `names` drawn from
/// `source`, in the order given.
///
/// Any existing file at `target` is overwritten. Payload offsets are
/// recomputed from scratch; names are preserved verbatim. Uses a
/// [`BulkAdder`] internally so copying thousands of entries costs one
/// directory flush rather than one per entry.
pub fn extract<P: AsRef<Path>>(
    target: P,
    source: &impl Container,
    names: &[&str],
) -> Result<FileContainer> {
    let mut out = FileContainer::create_empty(target)?;
    {
        let mut bulk = BulkAdder::new(&mut out);
        for name in names {
            let (_, entry) = source
                .find_first(name)
                .ok_or_else(|| Error::InvalidName((*name).to_string()))?;
            if entry.is_marker() {
                bulk.add_marker(name)?;
            } else {
                let bytes = source.read_payload(&entry)?;
                bulk.add_data(name, &bytes)?;
            }
        }
        bulk.release()?;
    }
    Ok(out)
}
