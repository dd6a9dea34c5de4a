//! Reader and writer for CDB constant database files.
//!
//! A constant database is written once and then only read. Keys and values
//! are opaque byte strings; a key may be stored more than once and every
//! value is kept.
//!
//! # Architecture
//!
//! - **Writer**: streams records to the sink as they are stored, keeps a
//!   `(hash, offset)` pair per record, and lays out the 256 slot tables and
//!   the header table on [`Writer::close`]
//! - **Reader**: loads the header table, then answers lookups by probing
//!   one slot table and scans records in file order
//! - **Access**: a reader reads through a memory map when it can and falls
//!   back to seek-and-read on the source when it cannot
//!
//! Both the standard 32-bit layout and the 64-bit variant (8-byte fields,
//! `cdb64:01` trailer) are supported. 32-bit files are interchangeable with
//! other CDB implementations.
//!
//! # Example
//!
//! ```no_run
//! use constdb::{Reader, WriterConfig};
//!
//! # fn main() -> constdb::Result<()> {
//! constdb::write_file("lookup.cdb", WriterConfig::default(), |w| {
//!     w.store(b"one", b"Hello, ")?;
//!     w.store(b"one", b"world!")?;
//!     w.store(b"two", &[1, 2, 3, 4])
//! })?;
//!
//! let mut reader = Reader::open("lookup.cdb")?;
//! assert_eq!(reader.values(b"one")?.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! Replacing a live file atomically (write elsewhere, then rename) is left
//! to the caller.

pub mod access;
pub mod error;
pub mod reader;
pub mod writer;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use access::{MappedView, PositionalIo, RandomAccess};
pub use constdb_types::{
    hash, BucketPointer, HeaderTable, Layout, Mode, ReaderConfig, WriterConfig, CDB64_MAGIC,
};
pub use error::{CdbError, Result};
pub use reader::{Iter, Reader, MAX_KEY_LEN, MAX_VALUE_LEN};
pub use writer::Writer;

/// Open a database file for reading, detecting its mode.
pub fn open(path: impl AsRef<Path>) -> Result<Reader<File>> {
    Reader::open(path)
}

/// Create a database file, fill it with `build`, close it and release the
/// file handle.
///
/// If `build` fails the writer is dropped unclosed and the error is
/// returned; the partial file must not be used.
pub fn write_file<F>(path: impl AsRef<Path>, config: WriterConfig, build: F) -> Result<()>
where
    F: FnOnce(&mut Writer<BufWriter<File>>) -> Result<()>,
{
    let mut writer = Writer::create(path, config)?;
    build(&mut writer)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_file_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block.cdb");

        write_file(&path, WriterConfig::default(), |w| {
            w.store(b"one", b"Hello, ")?;
            w.store(b"one", b"world!")?;
            w.store(b"two", &[1, 2, 3, 4])
        })
        .unwrap();

        let mut reader = open(&path).unwrap();
        assert_eq!(
            reader.values(b"one").unwrap(),
            vec![b"Hello, ".to_vec(), b"world!".to_vec()]
        );
        assert_eq!(reader.get(b"two").unwrap(), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn write_file_propagates_build_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.cdb");

        let err = write_file(&path, WriterConfig::default(), |w| {
            w.store(b"a", b"b")?;
            Err(CdbError::WriterClosed)
        })
        .unwrap_err();
        assert!(matches!(err, CdbError::WriterClosed));

        // Header never rewritten: the reader refuses the file.
        assert!(matches!(open(&path), Err(CdbError::EmptyDirectory)));
    }

    #[test]
    fn create_rejects_bad_config_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.cdb");
        let config = WriterConfig {
            hash_fill_factor: 0.0,
            ..Default::default()
        };
        assert!(Writer::create(&path, config).is_err());
        assert!(!path.exists());
    }
}
