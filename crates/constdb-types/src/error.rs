use thiserror::Error;

/// Errors produced by layout and configuration checks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("invalid mode {0}: expected 32 or 64")]
    InvalidMode(u32),

    #[error("unrecognized mode {0:?}: expected 32 or 64")]
    UnknownMode(String),

    #[error("invalid hash fill factor {0}: must be in (0, 1]")]
    InvalidFillFactor(f64),

    #[error("invalid header table length: expected {expected}, got {actual}")]
    HeaderLength { expected: usize, actual: usize },
}
