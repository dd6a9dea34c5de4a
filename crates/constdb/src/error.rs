use constdb_types::{LayoutError, Mode};
use thiserror::Error;

/// Errors from building or reading a constant database.
#[derive(Debug, Error)]
pub enum CdbError {
    /// Failure of the underlying sink or source, passed through unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid mode or fill factor supplied at construction.
    #[error("invalid configuration: {0}")]
    Layout(#[from] LayoutError),

    #[error("unable to read trailing 8 bytes for magic cookie (file is {len} bytes)")]
    MissingTrailer { len: u64 },

    #[error("{detected} mode detected in file; options request {requested} mode")]
    ModeMismatch { detected: Mode, requested: Mode },

    #[error("invalid file: hash directory is all empty")]
    EmptyDirectory,

    #[error("file truncated: {needed} bytes needed at offset {offset}, file is {len} bytes")]
    Truncated { offset: u64, needed: u64, len: u64 },

    #[error("{field} length {length} at offset {offset} exceeds limit {limit}")]
    OversizedLength {
        offset: u64,
        field: &'static str,
        length: u64,
        limit: u64,
    },

    #[error("malformed slot at offset {offset}: record offset {record_offset} is inside the header")]
    MalformedSlot { offset: u64, record_offset: u64 },

    /// A slot table filled up before every entry was placed. The sizing
    /// formula rules this out, so it indicates a bug rather than bad input.
    #[error("internal error: slot table for bucket {bucket} full with {slots} slots")]
    SlotTableFull { bucket: usize, slots: u64 },

    /// A bucket's slot table cannot be held in memory, typically because
    /// the fill factor is tiny.
    #[error("slot table for bucket {bucket} too large to build ({slots} slots)")]
    SlotTableTooLarge { bucket: usize, slots: u64 },

    #[error("{mode} file cannot address {needed} (limit {limit})")]
    OffsetOverflow { mode: Mode, needed: u64, limit: u64 },

    #[error("writer is closed")]
    WriterClosed,

    /// An earlier write to the sink failed; record offsets are no longer
    /// trustworthy.
    #[error("writer failed on an earlier write; the database is incomplete")]
    WriterFailed,

    #[error("reader is closed")]
    ReaderClosed,
}

/// Result alias for database operations.
pub type Result<T> = std::result::Result<T, CdbError>;
