//! Format-level types for constdb, a reader/writer for the CDB constant
//! database format.
//!
//! A CDB file is built once and then only read. Keys are spread over 256
//! independent open-addressed hash tables, so a lookup touches the header
//! directory, one slot table, and the matching records.
//!
//! # Key Types
//!
//! - [`Mode`] — 32-bit (standard) or 64-bit field widths
//! - [`Layout`] — field widths and region sizes derived from a mode
//! - [`HeaderTable`] — the 256-entry bucket directory
//! - [`hash`] — the DJB hash every implementation agrees on
//! - [`WriterConfig`] / [`ReaderConfig`] — construction options

pub mod config;
pub mod error;
pub mod hash;
pub mod header;
pub mod layout;
pub mod mode;

pub use config::{ReaderConfig, WriterConfig, DEFAULT_HASH_FILL_FACTOR};
pub use error::LayoutError;
pub use hash::{bucket_index, hash, probe_start, CdbHasher, HASH_SEED};
pub use header::{BucketPointer, HeaderTable};
pub use layout::{Layout, NUM_BUCKETS};
pub use mode::{Mode, CDB64_MAGIC};
